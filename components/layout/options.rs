/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Options for a layout session. Usually embedded in a larger configuration file, so they
//! (de)serialize with serde and every field has a default.

use app_units::Au;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Honour quirky user-agent margins (body, table cells, `discard` containers).
    pub quirks_mode: bool,

    /// True to turn off incremental layout: every `layout` call behaves as if
    /// `relayout_children` was set.
    pub nonincremental_layout: bool,

    /// Lay out multi-column blocks as columns. When false, column styles are ignored.
    pub columns_enabled: bool,

    /// Paginate the whole document. Document pagination and multi-column layout do not
    /// nest, so this also disables columns.
    pub paginated: bool,

    /// Viewport size in CSS pixels. The viewport is the initial containing block and the
    /// page size when paginating.
    pub viewport_width: f32,
    pub viewport_height: f32,

    /// Log a JSON dump of the box tree geometry after each top-level layout.
    pub dump_box_tree: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions {
            quirks_mode: false,
            nonincremental_layout: false,
            columns_enabled: true,
            paginated: false,
            viewport_width: 800.,
            viewport_height: 600.,
            dump_box_tree: false,
        }
    }
}

impl LayoutOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn viewport_inline_size(&self) -> Au {
        Au::from_f32_px(self.viewport_width.max(0.))
    }

    pub fn viewport_block_size(&self) -> Au {
        Au::from_f32_px(self.viewport_height.max(0.))
    }

    pub fn columns_allowed(&self) -> bool {
        self.columns_enabled && !self.paginated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = LayoutOptions::from_json(r#"{ "quirks_mode": true }"#).unwrap();
        assert!(options.quirks_mode);
        assert!(options.columns_enabled);
        assert_eq!(options.viewport_inline_size(), Au::from_px(800));
    }

    #[test]
    fn test_pagination_disables_columns() {
        let options = LayoutOptions {
            paginated: true,
            ..LayoutOptions::default()
        };
        assert!(!options.columns_allowed());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(LayoutOptions::from_json("{ \"paginated\": 3 }").is_err());
    }
}
