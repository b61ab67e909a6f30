mod dialer;

pub use dialer::NetDialer;
