//! Well-known content `type` values.
//!
//! `type` is an open string; these are the ones the site itself reads.

pub const HOME_PAGE: &str = "home-page";
pub const BLOG_PAGE: &str = "blog-page";
pub const CLIENTS_PAGE: &str = "clients-page";
pub const TESTIMONIAL: &str = "testimonial";
pub const BLOG_POST: &str = "blog-post";
