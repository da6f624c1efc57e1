//! External provider integrations.

pub mod idology {
    pub use crate::idology::*;
}

pub mod transport {
    pub use crate::transport::*;
}

pub mod trulioo {
    pub use crate::trulioo::*;
}
