use super::test_helpers::*;
use super::*;
use crate::types::{JobStatus, Quality, WorkItem};
use std::sync::Arc;
use std::time::Duration;

mod lifecycle;

/// Eleven-character item id derived from a number
fn item_id(n: usize) -> String {
    format!("item{n:07}")
}

fn items(n: usize) -> Vec<WorkItem> {
    (1..=n)
        .map(|i| WorkItem::new(item_id(i), Some(format!("Track {i}"))))
        .collect()
}
