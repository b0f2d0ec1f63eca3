pub mod diagnostics;
pub mod events;
pub mod health;
pub mod lobby;
pub mod negotiate;

pub use diagnostics::*;
pub use events::*;
pub use health::*;
pub use lobby::*;
pub use negotiate::*;
