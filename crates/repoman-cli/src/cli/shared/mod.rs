use super::*;

mod batch;
mod render;
mod workspace;

pub(in crate::cli) use batch::*;
pub(in crate::cli) use render::*;
pub(in crate::cli) use workspace::*;
