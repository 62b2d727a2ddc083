mod report;
mod scan;

pub use report::{Reporter, Verbosity};
pub use scan::{
    close_delim, find_first_not_of, find_first_of, find_last_not_of, find_last_of, is_name_char,
    token_at, NON_NAME, OPERATORS, PREPROC_OPS, WHITESPACE,
};
