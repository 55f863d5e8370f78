mod student_form;
mod student_list;

pub use student_form::StudentFormView;
pub use student_list::StudentListView;
