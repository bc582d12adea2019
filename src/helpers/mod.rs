//! Helper functions for dates, HTML and site URLs

mod date;
mod html;
mod url;

pub use self::date::*;
pub use self::html::*;
pub use self::url::*;
