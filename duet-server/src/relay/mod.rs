mod relay_dispatcher;

pub use relay_dispatcher::*;
