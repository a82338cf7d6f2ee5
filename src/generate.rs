//! Gallery page rendering.
//!
//! Turns a [`PageView`] into the `index.html` of one gallery. The view holds
//! only URLs and strings; deciding which files exist and where they live is
//! the [synchronizer](crate::sync)'s job.
//!
//! ## Page Layout
//!
//! ```text
//! <!DOCTYPE html>
//! <html class="pellicule" lang="en" data-thumbnail-src="…"><head>…</head><body>
//!   div#header      back link (when there is a parent) + h1 title
//!   nav#galleries   one card per child gallery
//!   div#tags        tag filter buttons (filled by script)
//!   main#media      one figure per media item
//! </body></html>
//! ```
//!
//! The root element always starts line 2, which is how a later build
//! recognizes the page as its own (see [`crate::scan::read_index`]).
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: grid layout
//! - `static/gallery.js`: tag filter
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Templates are type-safe Rust code with automatic XSS escaping.

use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/gallery.js");

/// Everything one gallery page shows.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub title: String,
    /// Title of the parent gallery; `None` for the root.
    pub parent_title: Option<String>,
    /// Thumbnail representing this gallery, recorded for read-back.
    pub thumbnail_src: Option<String>,
    pub children: Vec<ChildCard>,
    pub items: Vec<ItemView>,
}

/// A link to a child gallery.
#[derive(Debug, Clone)]
pub struct ChildCard {
    pub url: String,
    pub title: String,
    pub thumbnail_src: Option<String>,
}

/// One media figure.
#[derive(Debug, Clone)]
pub struct ItemView {
    /// Target of the thumbnail and caption links.
    pub href: String,
    pub thumbnail_src: Option<String>,
    pub title: String,
    pub classes: Vec<&'static str>,
    pub tags: Vec<String>,
}

fn render_header(view: &PageView) -> Markup {
    html! {
        div #header {
            @if let Some(parent) = &view.parent_title {
                a.up href=".." { "\u{2191} " (parent) }
            }
            h1 { (view.title) }
        }
    }
}

fn render_child(child: &ChildCard) -> Markup {
    html! {
        a.gallery href={ (child.url) "/" } {
            @if let Some(src) = &child.thumbnail_src {
                img src=(src) alt=(child.title) loading="lazy";
            }
            span.gallery-title { (child.title) }
        }
    }
}

fn render_item(item: &ItemView) -> Markup {
    let tags = (!item.tags.is_empty()).then(|| item.tags.join(","));
    html! {
        figure class=(item.classes.join(" ")) data-title=(item.title) data-tags=[tags] {
            a href=(item.href) {
                @if let Some(src) = &item.thumbnail_src {
                    img src=(src) alt=(item.title) loading="lazy";
                } @else {
                    span.placeholder { "\u{25B6}" }
                }
            }
            figcaption {
                a href=(item.href) { (item.title) }
            }
        }
    }
}

fn render_body(view: &PageView) -> Markup {
    html! {
        (render_header(view))
        @if !view.children.is_empty() {
            nav #galleries {
                @for child in &view.children {
                    (render_child(child))
                }
            }
        }
        div #tags {}
        main #media {
            @for item in &view.items {
                (render_item(item))
            }
        }
        script { (PreEscaped(JS)) }
    }
}

/// Render a complete `index.html`.
///
/// Line 1 is the doctype, line 2 holds the whole document starting with the
/// `<html class="pellicule"` root element.
pub fn render_page(view: &PageView) -> String {
    let document = html! {
        html class="pellicule" lang="en" data-thumbnail-src=[view.thumbnail_src.as_deref()] {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (view.title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (render_body(view))
            }
        }
    };
    format!("{}\n{}\n", DOCTYPE.0, document.into_string())
}
