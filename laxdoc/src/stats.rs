// SPDX-License-Identifier: Apache-2.0

//! Key-frequency statistics over a document.
//!
//! Every object is filed under a dotted path: the root is `root`, a child
//! object is `<parent>.<key>`, and array elements share their array's path.
//! For each path the walker counts the objects seen and how often each key
//! occurs in them, which shows the implicit schema of loosely typed data.

use core::fmt::Write;

use crate::hash_table::HashTable;
use crate::parse_error::CapacityError;
use crate::value::{Object, Value, ValueKind};

const ROOT_PATH: &[u8] = b"root";

/// Key counts for the objects found at one path.
#[derive(Debug, Clone)]
pub struct PathStats {
    object_count: usize,
    keys: HashTable<Box<[u8]>, usize>,
}

impl PathStats {
    fn new() -> Result<Self, CapacityError> {
        Ok(Self {
            object_count: 0,
            keys: HashTable::new(32)?,
        })
    }

    pub fn object_count(&self) -> usize {
        self.object_count
    }

    /// How many of the objects at this path carry `key`.
    pub fn frequency(&self, key: &[u8]) -> usize {
        self.keys.get(key).copied().unwrap_or(0)
    }

    /// Keys by descending frequency, ties broken by key.
    pub fn ranked(&self) -> Vec<(&[u8], usize)> {
        let mut ranked: Vec<_> = self
            .keys
            .iter()
            .map(|(key, &count)| (&key[..], count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

#[derive(Debug, Clone)]
pub struct KeyStats {
    paths: HashTable<Box<[u8]>, PathStats>,
}

/// Walks `value` and counts keys per object path.
pub fn collect_key_stats(value: &Value) -> Result<KeyStats, CapacityError> {
    let mut stats = KeyStats {
        paths: HashTable::new(0)?,
    };
    let mut path = ROOT_PATH.to_vec();
    stats.visit(value, &mut path)?;
    log::debug!("collected key statistics for {} paths", stats.paths.len());
    Ok(stats)
}

impl KeyStats {
    /// Statistics for a dotted path such as `root.servers`.
    pub fn path(&self, path: &str) -> Option<&PathStats> {
        self.paths.get(path.as_bytes())
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    fn visit(&mut self, value: &Value, path: &mut Vec<u8>) -> Result<(), CapacityError> {
        match value.kind() {
            ValueKind::Object(object) => self.visit_object(object, path),
            ValueKind::Array(array) => array.iter().try_for_each(|item| self.visit(item, path)),
            _ => Ok(()),
        }
    }

    fn visit_object(&mut self, object: &Object, path: &mut Vec<u8>) -> Result<(), CapacityError> {
        if self.paths.get(path.as_slice()).is_none() {
            self.paths.put(path.as_slice().into(), PathStats::new()?)?;
        }
        if let Some(entry) = self.paths.get_mut(path.as_slice()) {
            entry.object_count += 1;
            for attr in object.iter().filter(|attr| !attr.value().is_undefined()) {
                let key = attr.name().as_bytes();
                match entry.keys.get_mut(key) {
                    Some(count) => *count += 1,
                    None => {
                        entry.keys.put(key.into(), 1)?;
                    }
                }
            }
        }

        let parent_len = path.len();
        for attr in object.iter() {
            path.push(b'.');
            path.extend_from_slice(attr.name().as_bytes());
            let visited = self.visit(attr.value(), path);
            path.truncate(parent_len);
            visited?;
        }
        Ok(())
    }

    /// Draws the statistics as a tree.
    ///
    /// Keys of the root object are level 0; levels past `max_level` are not
    /// shown. Keys present in less than `min_ratio` of their path's objects
    /// are hidden along with their subtrees.
    pub fn render(&self, max_level: Option<usize>, min_ratio: f64) -> String {
        let mut out = String::new();
        if let Some(root) = self.paths.get(ROOT_PATH) {
            let _ = writeln!(out, ". (root, {} objects)", root.object_count);
            let mut path = ROOT_PATH.to_vec();
            self.render_path(&mut out, &mut path, "", 0, max_level, min_ratio);
        }
        out
    }

    fn render_path(
        &self,
        out: &mut String,
        path: &mut Vec<u8>,
        prefix: &str,
        level: usize,
        max_level: Option<usize>,
        min_ratio: f64,
    ) {
        if max_level.is_some_and(|max| level > max) {
            return;
        }
        let Some(entry) = self.paths.get(path.as_slice()) else {
            return;
        };

        let shown: Vec<_> = entry
            .ranked()
            .into_iter()
            .map(|(key, count)| (key, count, count as f64 / entry.object_count as f64))
            .filter(|&(_, _, ratio)| ratio >= min_ratio)
            .collect();

        let parent_len = path.len();
        for (i, &(key, count, ratio)) in shown.iter().enumerate() {
            let last = i + 1 == shown.len();
            let _ = writeln!(
                out,
                "{}{}── {} (freq {}, {:.1}%)",
                prefix,
                if last { "└" } else { "├" },
                String::from_utf8_lossy(key),
                count,
                ratio * 100.0
            );

            path.push(b'.');
            path.extend_from_slice(key);
            let child_prefix = format!("{}{}   ", prefix, if last { " " } else { "│" });
            self.render_path(out, path, &child_prefix, level + 1, max_level, min_ratio);
            path.truncate(parent_len);
        }
    }
}
