//! HTML pages
//!
//! Server-rendered pages for the browser surface:
//! - Landing page with record count and upload form
//! - Record listing with verify links
//! - One-line notices carried across redirects in the query string

mod notice;
mod pages;

pub use notice::{redirect_with_notice, Level, Notice, NoticeQuery};
pub use pages::{file_list, landing, message_page};
