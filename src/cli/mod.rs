mod auth;
mod history;
mod run;

pub use auth::auth;
pub use history::history;
pub use run::run;
