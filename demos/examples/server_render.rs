// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Server render, then client rehydration.
//!
//! Renders a few components into a per-request server sheet, prints the
//! `<style>` element that would be embedded in the response, then rehydrates a
//! headless client from that HTML and shows that rendering the same props
//! injects nothing new.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_sheet_demos --example server_render`

use understory_sheet::{
    BasicStringifier, ComponentStyle, GlobalStyle, Keyframes, Registry, RuleSet, Sheet,
    SheetOptions, StyleElement, parse_style_tags,
};

struct Theme {
    accent: &'static str,
    primary: bool,
}

struct App {
    reset: GlobalStyle<Theme>,
    title: ComponentStyle<Theme>,
    button: ComponentStyle<Theme>,
}

/// Component definitions run once per process, in the same order on the
/// server and in the browser.
fn define(registry: &Registry) -> App {
    let reset = GlobalStyle::new(
        RuleSet::new().css("html, body { margin: 0; font-family: sans-serif; }"),
        registry.generate_component_id("GlobalReset"),
        registry,
    );
    let fade = Keyframes::new("from { opacity: 0; } to { opacity: 1; }");
    let title = ComponentStyle::new(
        RuleSet::new()
            .css("font-size: 2em; animation: ")
            .push(fade)
            .css(" 300ms ease-in;"),
        registry.generate_component_id("Title"),
        registry,
    );
    let button = ComponentStyle::new(
        RuleSet::new()
            .css("padding: 0.5em 1em; border: none;")
            .dynamic(|t: &Theme| format!("background: {};", t.accent).into())
            .dynamic(|t: &Theme| {
                if t.primary {
                    "&:hover { filter: brightness(1.1); }".into()
                } else {
                    "".into()
                }
            })
            .declarations([("borderRadius", "4px")]),
        registry.generate_component_id("Button"),
        registry,
    );
    App {
        reset,
        title,
        button,
    }
}

/// Renders the page's components and returns their class names.
fn render(app: &App, sheet: &mut Sheet) -> Vec<String> {
    let themes = [
        Theme {
            accent: "rebeccapurple",
            primary: true,
        },
        Theme {
            accent: "gray",
            primary: false,
        },
    ];
    app.reset
        .render_styles(1, &themes[0], sheet, &BasicStringifier);
    let mut classes = vec![app.title.generate_and_inject_styles(&themes[0], sheet, &BasicStringifier)];
    for theme in &themes {
        classes.push(app.button.generate_and_inject_styles(theme, sheet, &BasicStringifier));
    }
    classes
}

fn main() {
    env_logger::init();

    // Server: one registry per process, one sheet per request.
    let server_registry = Registry::new();
    let server_app = define(&server_registry);
    let mut request = Sheet::server(server_registry);
    let classes = render(&server_app, &mut request);
    let html = format!("<!doctype html><html><head>{}</head><body></body></html>", request.to_style_tag());
    println!("server classes: {classes:?}");
    println!("{html}\n");

    // Client: definitions run again, then the page's containers are adopted.
    let client_registry = Registry::new();
    let client_app = define(&client_registry);
    let options = SheetOptions::from_env();
    let containers = parse_style_tags(&html, &options.attr)
        .into_iter()
        .map(|el| Box::new(el) as Box<dyn StyleElement>)
        .collect();
    let mut client = Sheet::new(options, client_registry);
    match client.rehydrate_once(containers) {
        Some(summary) => log::info!("rehydrated: {summary:?}"),
        None => log::info!("nothing to rehydrate"),
    }

    let before = client.css();
    let client_classes = render(&client_app, &mut client);
    assert_eq!(classes, client_classes, "server and client agree on class names");
    println!("client classes: {client_classes:?}");
    println!(
        "rules injected after rehydration: {}",
        client.css().lines().count() - before.lines().count()
    );
    println!("\nclient css:\n{}", client.css());
}
