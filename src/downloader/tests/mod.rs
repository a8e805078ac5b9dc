use super::test_helpers::{FakeFetcher, create_test_downloader, test_config, urls, wait_for_status};
use super::*;
use crate::types::{Status, Task, TaskId};
use std::time::Duration;
