mod background;

pub use background::Background;
