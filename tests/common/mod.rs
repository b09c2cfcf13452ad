//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use docref::entity::ParsedTree;
use std::path::PathBuf;
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; later calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// One file holding a class (one method, which fires one hook), a function (which fires one hook),
/// and a file-scoped reference stub hook.
///
/// The file docblock carries `@package WordPress` and `@subpackage Widgets`; the function overrides
/// the package with its own `@package Core`.
#[allow(dead_code)]
pub const WIDGETS_EXPORT: &str = r#"[
  {
    "path": "wp-includes/class-wp-widget.php",
    "file": {
      "description": "Widget API: WP_Widget base class",
      "long_description": "",
      "tags": [
        {"name": "package", "content": "WordPress"},
        {"name": "subpackage", "content": "Widgets"}
      ]
    },
    "functions": [
      {
        "name": "the_widget",
        "line": 1090,
        "end_line": 1160,
        "arguments": [
          {"name": "$widget", "default": null, "type": "string"},
          {"name": "$instance", "default": "array()", "type": "array"}
        ],
        "doc": {
          "description": "Output an arbitrary widget as a template tag.",
          "long_description": "",
          "tags": [
            {"name": "since", "content": "2.8.0"},
            {"name": "package", "content": "Core"}
          ]
        },
        "hooks": [
          {
            "name": "the_widget",
            "type": "action",
            "line": 1155,
            "end_line": 1155,
            "arguments": ["$widget", "$instance", "$args"],
            "doc": {
              "description": "Fires before rendering the requested widget.",
              "long_description": "",
              "tags": [{"name": "since", "content": "3.0.0"}]
            }
          }
        ]
      }
    ],
    "classes": [
      {
        "name": "WP_Widget",
        "line": 17,
        "end_line": 620,
        "final": false,
        "abstract": false,
        "extends": null,
        "implements": [],
        "properties": [
          {"name": "$id_base", "line": 25, "end_line": 25, "default": null, "static": false, "visibility": "public"}
        ],
        "doc": {
          "description": "Core base class extended to register widgets.",
          "long_description": "This class must be extended for each widget.",
          "tags": [{"name": "since", "content": "2.8.0"}]
        },
        "methods": [
          {
            "name": "display_callback",
            "line": 360,
            "end_line": 410,
            "final": false,
            "abstract": false,
            "static": false,
            "visibility": "public",
            "arguments": [
              {"name": "$args", "default": null, "type": "array"}
            ],
            "doc": {
              "description": "Generates the actual widget content.",
              "long_description": "",
              "tags": [{"name": "since", "content": "2.8.0"}]
            },
            "hooks": [
              {
                "name": "widget_display_callback",
                "type": "filter",
                "line": 390,
                "end_line": 390,
                "arguments": ["$instance", "$this", "$args"],
                "doc": {
                  "description": "Filters the settings for a particular widget instance.",
                  "long_description": "Returning false will effectively short-circuit display of the widget.",
                  "tags": [{"name": "since", "content": "2.8.0"}]
                }
              }
            ]
          }
        ]
      }
    ],
    "hooks": [
      {
        "name": "widget_title",
        "type": "filter",
        "line": 600,
        "end_line": 600,
        "arguments": ["$title"],
        "doc": {
          "description": "This filter is documented in wp-includes/widgets/class-wp-widget-pages.php",
          "long_description": "",
          "tags": []
        }
      }
    ]
  }
]"#;

#[allow(dead_code)]
pub fn widgets_tree() -> ParsedTree {
    ParsedTree::from_json(WIDGETS_EXPORT).unwrap()
}

/// Write [`WIDGETS_EXPORT`] into `temp_dir` and return its path.
#[allow(dead_code)]
pub fn write_widgets_export(temp_dir: &TempDir) -> PathBuf {
    let path = temp_dir.path().join("widgets.json");
    std::fs::write(&path, WIDGETS_EXPORT).unwrap();
    path
}
