// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Poison-recovering lock helpers.
//!
//! The registry and tag index are plain `std::sync::RwLock` maps shared by the
//! command surface and every download task. A panic inside one task must not
//! take the whole manager down with it, so instead of unwrapping a poisoned
//! guard we log the event and keep going with the data as it was left.
//!
//! ```
//! use std::sync::RwLock;
//! use tagfetch::locks::{resilient_read, resilient_write};
//!
//! let lock = RwLock::new(vec![1u64]);
//! resilient_write(&lock).push(2);
//! assert_eq!(resilient_read(&lock).len(), 2);
//! ```

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read lock, recovering from poisoning if necessary.
#[inline]
pub fn resilient_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "tagfetch::locks",
                event = "LOCK_POISONED_READ",
                "RwLock was poisoned during read acquisition; recovering. \
                 A download task previously panicked while holding this lock."
            );
            poisoned.into_inner()
        }
    }
}

/// Acquire a write lock, recovering from poisoning if necessary.
#[inline]
pub fn resilient_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "tagfetch::locks",
                event = "LOCK_POISONED_WRITE",
                "RwLock was poisoned during write acquisition; recovering. \
                 A download task previously panicked while holding this lock."
            );
            poisoned.into_inner()
        }
    }
}
