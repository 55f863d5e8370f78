mod input;
mod pagination;
mod toast;

pub use input::{InputResult, TextInput};
pub use pagination::{total_pages, Pagination};
pub use toast::{ToastLevel, Toasts};
