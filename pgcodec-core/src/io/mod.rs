mod buf;

pub use buf::BufExt;
