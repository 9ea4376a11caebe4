// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use understory_sheet::{
    ACTIVE_VALUE, InsertMode, Registry, RuleError, Sheet, SheetOptions, StyleElement, VERSION,
};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CssStyleSheet, Document, HtmlStyleElement, Node};

/// A `<style>` element in the live document.
#[derive(Clone, Debug)]
pub struct WebStyleElement {
    element: HtmlStyleElement,
}

impl WebStyleElement {
    /// Wraps an existing element.
    pub fn new(element: HtmlStyleElement) -> Self {
        Self { element }
    }

    /// Returns the underlying element.
    pub fn element(&self) -> &HtmlStyleElement {
        &self.element
    }

    fn sheet(&self) -> Option<CssStyleSheet> {
        self.element.sheet()?.dyn_into::<CssStyleSheet>().ok()
    }
}

fn describe(err: &JsValue) -> String {
    err.dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"))
}

fn js_index(index: usize) -> Result<u32, RuleError> {
    u32::try_from(index).map_err(|_| RuleError::OutOfBounds {
        index,
        len: u32::MAX as usize,
    })
}

impl StyleElement for WebStyleElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.element.get_attribute(name)
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        if let Err(err) = self.element.set_attribute(name, value) {
            log::warn!("failed to set `{name}` on a style container: {}", describe(&err));
        }
    }

    fn text_content(&self) -> String {
        self.element.text_content().unwrap_or_default()
    }

    fn set_text_content(&mut self, text: &str) {
        self.element.set_text_content(Some(text));
    }

    fn supports_cssom(&self) -> bool {
        self.sheet().is_some()
    }

    fn insert_rule(&mut self, rule: &str, index: usize) -> Result<(), RuleError> {
        let sheet = self.sheet().ok_or_else(|| RuleError::Rejected {
            reason: "style element has no sheet".into(),
        })?;
        sheet
            .insert_rule_with_index(rule, js_index(index)?)
            .map(|_| ())
            .map_err(|err| RuleError::Rejected {
                reason: describe(&err),
            })
    }

    fn delete_rule(&mut self, index: usize) {
        let (Some(sheet), Ok(index)) = (self.sheet(), js_index(index)) else {
            return;
        };
        if let Err(err) = sheet.delete_rule(index) {
            log::warn!("failed to delete rule {index}: {}", describe(&err));
        }
    }

    fn rule_text(&self, index: usize) -> Option<String> {
        let rules = self.sheet()?.css_rules().ok()?;
        Some(rules.get(js_index(index).ok()?)?.css_text())
    }

    fn rule_count(&self) -> usize {
        self.sheet()
            .and_then(|sheet| sheet.css_rules().ok())
            .map_or(0, |rules| rules.length() as usize)
    }

    fn remove(&mut self) {
        self.element.remove();
    }
}

/// Marker-tagged `<style>` elements in document order.
pub fn find_containers(document: &Document, options: &SheetOptions) -> Vec<WebStyleElement> {
    let selector = format!("style[{}]", options.attr);
    let Ok(nodes) = document.query_selector_all(&selector) else {
        log::warn!("invalid container selector `{selector}`");
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.get(i))
        .filter_map(|node| node.dyn_into::<HtmlStyleElement>().ok())
        .map(WebStyleElement::new)
        .collect()
}

/// Creates an empty container after the last existing one, or at the end of
/// `<head>`.
pub fn create(document: &Document, options: &SheetOptions) -> Result<WebStyleElement, JsValue> {
    let element = document
        .create_element("style")?
        .dyn_into::<HtmlStyleElement>()?;
    element.set_attribute(&options.attr, ACTIVE_VALUE)?;
    element.set_attribute(&options.version_attr(), VERSION)?;
    let mode = if options.use_cssom {
        InsertMode::Cssom
    } else {
        InsertMode::Text
    };
    element.set_attribute(&options.mode_attr(), mode.as_str())?;
    if let Some(nonce) = &options.nonce {
        element.set_attribute("nonce", nonce)?;
    }

    let last = find_containers(document, options).pop();
    let parent: Node = match last.as_ref().and_then(|c| c.element.parent_node()) {
        Some(parent) => parent,
        None => document
            .head()
            .ok_or_else(|| JsValue::from_str("document has no <head>"))?
            .into(),
    };
    let next = last.and_then(|c| c.element.next_sibling());
    parent.insert_before(&element, next.as_ref())?;
    Ok(WebStyleElement::new(element))
}

/// Builds the page's master sheet.
///
/// Existing containers are rehydrated the first time this runs for
/// `registry`. New rules go to the adopted container, or to a fresh one when
/// nothing could be adopted.
pub fn master_sheet(
    document: &Document,
    registry: Registry,
    options: &SheetOptions,
) -> Result<Sheet, JsValue> {
    let mut sheet = Sheet::new(options.clone(), registry);
    let containers = find_containers(document, options)
        .into_iter()
        .map(|c| Box::new(c) as Box<dyn StyleElement>)
        .collect();
    let adopted = sheet
        .rehydrate_once(containers)
        .is_some_and(|summary| summary.adopted);
    if !adopted {
        sheet.set_target(Box::new(create(document, options)?));
    }
    Ok(sheet)
}
