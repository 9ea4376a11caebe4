// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Sheet: runtime CSS rule caching, grouping and injection.
//!
//! Components declare their styles as [`RuleSet`]s. On every render a
//! [`ComponentStyle`] flattens its rules against the render context, derives a
//! class name from the hash of the result and, if the [`Sheet`] has not seen
//! that name yet, stringifies the CSS and inserts it. The pieces are:
//!
//! - **Groups** ([`GroupIdAllocator`], [`Registry`]): dense numbers assigned to
//!   component identities in registration order. The registry is shared by
//!   every sheet of a process and decides where each component's rules land.
//! - **Tags** ([`Tag`], [`make_tag`]): indexed rule storage over a style
//!   container ([`StyleElement`]) or an in-memory buffer. Deleting leaves a
//!   placeholder so indices never shift.
//! - **Grouped tags** ([`GroupedTag`]): one contiguous run of slots per group,
//!   laid out in group order whatever the render order.
//! - **Sheets** ([`Sheet`]): the name cache over a lazily created grouped tag,
//!   with forking for isolated per-request sheets.
//! - **Rehydration** ([`rehydrate()`], [`output_sheet`]): reading server output
//!   back so nothing is injected twice, and producing that output.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_sheet::{BasicStringifier, ComponentStyle, Registry, RuleSet, Sheet};
//!
//! let registry = Registry::new();
//! let title = ComponentStyle::new(
//!     RuleSet::<()>::new().css("font-size: 2em; &:hover { color: red; }"),
//!     registry.generate_component_id("Title"),
//!     &registry,
//! );
//!
//! // One sheet per server response.
//! let mut sheet = Sheet::server(registry.clone());
//! let class = title.generate_and_inject_styles(&(), &mut sheet, &BasicStringifier);
//! assert_eq!(
//!     sheet.css(),
//!     format!(".{class}{{font-size:2em;}}\n.{class}:hover{{color:red;}}\n")
//! );
//!
//! // Rendering again with the same output is a cache hit.
//! title.generate_and_inject_styles(&(), &mut sheet, &BasicStringifier);
//! assert_eq!(sheet.css().lines().count(), 2);
//!
//! // The `<style>` element to embed in the HTML response.
//! let html = sheet.to_style_tag();
//! assert!(html.contains(&format!("data-styled=\"{class}\"")));
//! ```
//!
//! ## Server output and rehydration
//!
//! A server sheet serializes to marker text: one `/* sc-component-id:<id> */`
//! comment per group followed by its rules. The names it holds go into the
//! container's `data-styled` attribute. On the client, [`Sheet::rehydrate_once`]
//! reads those containers back, replays group positions into the registry and
//! registers every name, so components rendering the same CSS find it cached.
//!
//! ```rust
//! use understory_sheet::{MemoryElement, Registry, Sheet, SheetOptions, StyleElement, parse_style_tags};
//!
//! let mut server = Sheet::server(Registry::new());
//! let _ = server.insert_rules("sc-a", "abc", [".abc{color:red;}"]);
//! let html = server.to_style_tag();
//!
//! let containers: Vec<Box<dyn StyleElement>> = parse_style_tags(&html, "data-styled")
//!     .into_iter()
//!     .map(|el| Box::new(el) as Box<dyn StyleElement>)
//!     .collect();
//! let mut client = Sheet::new(SheetOptions::default(), Registry::new());
//! let summary = client.rehydrate_once(containers).unwrap();
//! assert!(summary.adopted);
//! assert!(client.has_name_for_id("sc-a", "abc"));
//! assert_eq!(client.css(), ".abc{color:red;}\n");
//! ```
//!
//! ## Configuration
//!
//! [`SheetOptions`] selects the storage medium and marker attribute.
//! [`SheetOptions::from_env`] honours `SC_ATTR` and `SC_DISABLE_SPEEDY`.
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`SheetOptions`] and [`InsertMode`].

extern crate alloc;

mod component;
mod element;
mod error;
mod global;
mod grouped;
pub mod hash;
pub mod markers;
mod options;
mod registry;
mod rehydrate;
mod rules;
mod sheet;
mod stringify;
mod tag;
mod tags;

pub use component::ComponentStyle;
pub use element::{MemoryElement, StyleElement, validate_rule};
pub use error::{InsertOutcome, RehydrateError, RejectedRule, RuleError};
pub use global::GlobalStyle;
pub use grouped::GroupedTag;
pub use options::{
    ACTIVE_VALUE, DEFAULT_ATTR, GROUP_MARKER_PREFIX, InsertMode, SheetOptions, UnknownInsertMode,
    VERSION,
};
pub use registry::{GroupId, GroupIdAllocator, Registry};
pub use rehydrate::{
    ContainerContents, RehydrateSummary, output_sheet, parse_style_tags, read_container,
    rehydrate, style_tag,
};
pub use rules::{DynamicFn, Interpolation, Keyframes, RuleSet, flatten};
pub use sheet::Sheet;
pub use stringify::{BasicStringifier, Stringifier};
pub use tag::{Tag, make_tag};
pub use tags::{CssomTag, TextTag, VirtualTag};
