// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser style containers for `understory_sheet`.
//!
//! This crate implements [`StyleElement`](understory_sheet::StyleElement) over
//! `<style>` elements when targeting `wasm32`, and builds the page's master
//! [`Sheet`](understory_sheet::Sheet): server-rendered containers are
//! rehydrated once, then new rules go to the adopted container or a fresh one.
//!
//! ```no_run
//! #[cfg(target_arch = "wasm32")]
//! fn page_sheet(
//!     registry: understory_sheet::Registry,
//! ) -> Result<understory_sheet::Sheet, wasm_bindgen::JsValue> {
//!     let document = web_sys::window()
//!         .and_then(|w| w.document())
//!         .ok_or_else(|| wasm_bindgen::JsValue::from_str("no document"))?;
//!     understory_sheet_web::master_sheet(&document, registry, &understory_sheet::SheetOptions::default())
//! }
//! ```
//!
//! On other targets the crate is empty.

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{WebStyleElement, create, find_containers, master_sheet};
