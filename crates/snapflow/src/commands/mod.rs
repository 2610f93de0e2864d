pub mod apply;
pub mod destroy;
pub mod plan;
pub mod refresh;
pub mod state;
pub mod validate;
