pub mod arguments;
pub mod document;
pub mod hash;
pub mod operation;
pub mod response_path;
pub mod selection_item;
pub mod selection_set;
pub mod value;

pub(crate) fn indentation(depth: usize) -> String {
    "  ".repeat(depth)
}
