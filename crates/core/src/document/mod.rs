pub mod kinds;
pub mod model;
pub mod references;
pub mod validate;

pub use model::{
    ContentDocument, ContentQuery, ContentUpdate, Metadata, NewContent, NewTheme, PageView,
    Subscriber, Theme, ThemeSettings, ThemeUpdate,
};
