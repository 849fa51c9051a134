pub mod analytics;
pub mod container;
pub mod credential;
pub mod insight;
pub mod post;
pub mod quota;
