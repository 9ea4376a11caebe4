// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in [`Tag`](crate::Tag) backends.

mod cssom;
mod text;
mod virtual_tag;

pub use cssom::CssomTag;
pub use text::TextTag;
pub use virtual_tag::VirtualTag;

use crate::element::StyleElement;
use crate::options::{ACTIVE_VALUE, InsertMode, SheetOptions, VERSION};

/// Stamps the marker attributes a container needs to be found again later.
fn mark_element(element: &mut dyn StyleElement, options: &SheetOptions, mode: InsertMode) {
    if element.attribute(&options.attr).is_none() {
        element.set_attribute(&options.attr, ACTIVE_VALUE);
    }
    element.set_attribute(&options.version_attr(), VERSION);
    element.set_attribute(&options.mode_attr(), mode.as_str());
}
