/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Geometry dumps of the box tree, for debugging and for tests.

use app_units::Au;
use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::box_tree::{BoxId, BoxKind, BoxTree};
use crate::geom::{LogicalRect, LogicalSides};

/// The laid out geometry of one box and its descendants.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeometrySnapshot {
    pub kind: &'static str,
    pub anonymous: bool,
    pub frame: LogicalRect<Au>,
    pub margin: LogicalSides<Au>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<LogicalRect<Au>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub floats: Vec<LogicalRect<Au>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overflow: Option<LogicalRect<Au>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<GeometrySnapshot>,
}

fn kind_name(kind: &BoxKind) -> &'static str {
    match kind {
        BoxKind::Block(_) => "block",
        BoxKind::Inline => "inline",
        BoxKind::Text(_) => "text",
        BoxKind::Replaced { .. } => "replaced",
        BoxKind::LineBreak => "line-break",
    }
}

impl BoxTree {
    /// Snapshot of the subtree rooted at `id`.
    pub fn geometry_snapshot(&self, id: BoxId) -> Option<GeometrySnapshot> {
        let node = self.get(id)?;
        let block = node.block();
        Some(GeometrySnapshot {
            kind: kind_name(&node.kind),
            anonymous: node.is_anonymous(),
            frame: node.frame,
            margin: node.margin,
            lines: block
                .map(|block| block.lines.iter().map(|line| line.rect()).collect())
                .unwrap_or_default(),
            floats: block
                .and_then(|block| block.floats.as_deref())
                .map(|floats| floats.iter().map(|(_, record)| record.rect()).collect())
                .unwrap_or_default(),
            overflow: block.and_then(|block| block.overflow),
            children: self
                .children(id)
                .iter()
                .filter_map(|child| self.geometry_snapshot(*child))
                .collect(),
        })
    }
}

/// One line per box, indented by depth.
pub fn outline(tree: &BoxTree, id: BoxId) -> String {
    fn visit(tree: &BoxTree, id: BoxId, depth: usize, lines: &mut Vec<String>) {
        let node = &tree[id];
        let frame = node.frame;
        lines.push(format!(
            "{:indent$}{} {:?} @({}, {}) {}x{}",
            "",
            kind_name(&node.kind),
            id,
            frame.start_corner.inline.to_f32_px(),
            frame.start_corner.block.to_f32_px(),
            frame.size.inline.to_f32_px(),
            frame.size.block.to_f32_px(),
            indent = depth * 2,
        ));
        for child in tree.children(id) {
            visit(tree, *child, depth + 1, lines);
        }
    }

    let mut lines = Vec::new();
    if tree.contains(id) {
        visit(tree, id, 0, &mut lines);
    }
    lines.iter().join("\n")
}

/// Logs the geometry of the subtree rooted at `id` as JSON.
pub(crate) fn dump(tree: &BoxTree, id: BoxId) {
    let Some(snapshot) = tree.geometry_snapshot(id) else {
        return;
    };
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => debug!("Box tree geometry:\n{json}"),
        Err(error) => warn!("Could not serialize box tree geometry: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::BoxStyle;

    #[test]
    fn test_outline_indents_children() {
        let mut tree = BoxTree::new();
        let root = tree.new_block(BoxStyle::block());
        tree.set_root(root);
        let child = tree.new_block(BoxStyle::block());
        tree.append_child(root, child);

        let outline = outline(&tree, root);
        let lines: Vec<&str> = outline.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("block"));
        assert!(lines[1].starts_with("  block"));
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let mut tree = BoxTree::new();
        let root = tree.new_block(BoxStyle::block());
        tree.set_root(root);
        let snapshot = tree.geometry_snapshot(root).unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["kind"], "block");
        assert!(json.get("children").is_none());
    }
}
