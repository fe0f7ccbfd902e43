pub use crate::effects::{Dispose, disposable_effect};
pub use crate::locals::{local, with_local};
pub use crate::runtime::{
    Session, remember, remember_state, remember_state_with_key, remember_with_key,
};
pub use crate::scope::{Scope, current_scope, scoped_effect};
pub use crate::signal::{Signal, signal};
