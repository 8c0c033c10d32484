//! HTML pages for the web interface.
//!
//! ## Pages
//!
//! - **Index** (`/`): every group in index order, with its image count and
//!   the first few images as previews.
//! - **Gallery** (`/gallery/{group-id}?page=N`): one group's images, paginated.
//! - **Not found**: shown for unknown group ids.
//!
//! Group order and image order come straight from the
//! [`GroupIndex`](crate::index::GroupIndex); nothing here sorts. Pagination is
//! a window over the group's image list.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! All interpolation is auto-escaped, so file names with markup in them are
//! displayed, not interpreted.

use crate::config::BrowseConfig;
use crate::discover::ImageItem;
use crate::index::{Group, GroupIndex};
use maud::{DOCTYPE, Markup, html};

const CSS: &str = include_str!("../static/style.css");

// ============================================================================
// Pagination
// ============================================================================

/// A window of one group's images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page, 1-based, clamped into `1..=pages`.
    pub page: usize,
    /// Total pages. Always at least 1, even for an empty group.
    pub pages: usize,
    /// Item range of the current page.
    pub start: usize,
    pub end: usize,
}

impl Pagination {
    /// Window for `requested` (1-based) over `total` items. Out-of-range
    /// requests land on the nearest valid page.
    pub fn new(total: usize, page_size: usize, requested: usize) -> Self {
        let page_size = page_size.max(1);
        let pages = total.div_ceil(page_size).max(1);
        let page = requested.clamp(1, pages);
        let start = (page - 1) * page_size;
        let end = (start + page_size).min(total);
        Self {
            page,
            pages,
            start,
            end,
        }
    }

    pub fn prev(&self) -> Option<usize> {
        (self.page > 1).then(|| self.page - 1)
    }

    pub fn next(&self) -> Option<usize> {
        (self.page < self.pages).then(|| self.page + 1)
    }
}

// ============================================================================
// URLs
// ============================================================================

/// Gallery URL for a group and page.
pub fn gallery_url(group: &Group, page: usize) -> String {
    if page <= 1 {
        format!("/gallery/{}", group.id)
    } else {
        format!("/gallery/{}?page={}", group.id, page)
    }
}

/// Image URL. The trailing name is cosmetic; the id alone selects the image.
pub fn image_url(image: &ImageItem) -> String {
    format!("/image/{}/{}", image.id, url_safe_name(&image.name))
}

/// Keep a name readable in a URL path segment: anything outside
/// `[A-Za-z0-9._-]` becomes `_`.
fn url_safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (CSS) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Renders the header with breadcrumb
fn site_header(breadcrumb: Markup) -> Markup {
    html! {
        header.site-header {
            nav.breadcrumb {
                (breadcrumb)
            }
        }
    }
}

fn count_label(count: usize) -> String {
    if count == 1 {
        "1 image".to_string()
    } else {
        format!("{count} images")
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders the index page listing every group.
pub fn render_index(index: &GroupIndex, browse: &BrowseConfig) -> Markup {
    let breadcrumb = html! {
        "Gallery"
    };

    let content = html! {
        (site_header(breadcrumb))
        main.index-page {
            @if index.is_empty() {
                p.empty-state { "No images found" }
            } @else {
                div.group-list {
                    @for group in index.groups() {
                        section.group-card {
                            a.group-title href=(gallery_url(group, 1)) { (group.title) }
                            span.group-count { (count_label(group.len())) }
                            div.preview-strip {
                                @for image in group.images.iter().take(browse.preview_count) {
                                    a href=(gallery_url(group, 1)) {
                                        img src=(image_url(image)) alt=(image.name) loading="lazy";
                                    }
                                }
                            }
                        }
                    }
                }
            }
            @if !index.warnings().is_empty() {
                details.warnings {
                    summary { (index.warnings().len()) " warnings" }
                    ul {
                        @for warning in index.warnings() {
                            li { (warning.to_string()) }
                        }
                    }
                }
            }
        }
    };

    base_document("Gallery", None, content)
}

/// Renders one page of a group's images.
pub fn render_gallery(group: &Group, pagination: &Pagination) -> Markup {
    let breadcrumb = html! {
        a href="/" { "Gallery" }
        " › "
        (group.title)
    };

    let content = html! {
        (site_header(breadcrumb))
        main.gallery-page {
            header.gallery-header {
                h1 { (group.title) }
                p.group-location { (group.location.display().to_string()) }
                p.group-count { (count_label(group.len())) }
            }
            div.image-grid {
                @for image in &group.images[pagination.start..pagination.end] {
                    figure {
                        a href=(image_url(image)) {
                            img src=(image_url(image)) alt=(image.name) loading="lazy";
                        }
                        figcaption { (image.name) }
                    }
                }
            }
            @if pagination.pages > 1 {
                nav.pagination {
                    @if let Some(prev) = pagination.prev() {
                        a.prev href=(gallery_url(group, prev)) { "‹ Previous" }
                    }
                    span.page-status { "Page " (pagination.page) " of " (pagination.pages) }
                    @if let Some(next) = pagination.next() {
                        a.next href=(gallery_url(group, next)) { "Next ›" }
                    }
                }
            }
        }
    };

    base_document(&group.title, Some("gallery"), content)
}

/// Renders a not-found page.
pub fn render_not_found(what: &str) -> Markup {
    let breadcrumb = html! {
        a href="/" { "Gallery" }
    };

    let content = html! {
        (site_header(breadcrumb))
        main {
            p.empty-state { (what) " not found" }
        }
    };

    base_document("Not found", None, content)
}
