//! Command registry.
//!
//! Maps command names to handlers. Commands that act on behalf of the
//! current user are registered as [`Command::LoggedIn`]; the registry
//! resolves the user before calling them and passes it in explicitly.

use std::collections::HashMap;

use futures::future::BoxFuture;
use tracing::debug;

use super::handlers;
use super::AppState;
use crate::db::User;
use crate::{GatorError, Result};

/// Handler for a command that needs no user.
pub type Handler = for<'a> fn(&'a mut AppState, &'a [String]) -> BoxFuture<'a, Result<()>>;

/// Handler for a command that runs as the current user.
pub type UserHandler =
    for<'a> fn(&'a mut AppState, &'a [String], User) -> BoxFuture<'a, Result<()>>;

/// A registered command.
#[derive(Clone, Copy)]
pub enum Command {
    /// Runs without a user.
    Plain(Handler),
    /// Runs as the logged-in user.
    LoggedIn(UserHandler),
}

impl Command {
    /// Call the handler, resolving the current user first if required.
    pub async fn call(&self, state: &mut AppState, args: &[String]) -> Result<()> {
        match self {
            Command::Plain(handler) => handler(state, args).await,
            Command::LoggedIn(handler) => {
                let user = state.current_user().await?;
                handler(state, args, user).await
            }
        }
    }
}

/// Name to handler registry.
pub struct Commands {
    registry: HashMap<&'static str, Command>,
}

impl Commands {
    /// Create a registry holding every gator command.
    pub fn new() -> Self {
        let mut commands = Self::empty();
        commands.register("register", Command::Plain(handlers::register));
        commands.register("login", Command::Plain(handlers::login));
        commands.register("reset", Command::Plain(handlers::reset));
        commands.register("users", Command::Plain(handlers::users));
        commands.register("agg", Command::Plain(handlers::agg));
        commands.register("feeds", Command::Plain(handlers::feeds));
        commands.register("addfeed", Command::LoggedIn(handlers::add_feed));
        commands.register("follow", Command::LoggedIn(handlers::follow));
        commands.register("following", Command::LoggedIn(handlers::following));
        commands.register("unfollow", Command::LoggedIn(handlers::unfollow));
        commands.register("browse", Command::LoggedIn(handlers::browse));
        commands
    }

    /// Create an empty registry.
    pub fn empty() -> Self {
        Self {
            registry: HashMap::new(),
        }
    }

    /// Register a command, replacing any previous one with the same name.
    pub fn register(&mut self, name: &'static str, command: Command) {
        self.registry.insert(name, command);
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.registry.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run the command called `name`.
    pub async fn run(&self, state: &mut AppState, name: &str, args: &[String]) -> Result<()> {
        let command = self.registry.get(name).ok_or_else(|| {
            GatorError::Validation(format!(
                "unknown command: {name} (available: {})",
                self.names().join(", ")
            ))
        })?;

        debug!("Running command {} with {} argument(s)", name, args.len());
        command.call(state, args).await
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use super::*;
    use crate::config::Config;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    static PLAIN_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn count_plain<'a>(_state: &'a mut AppState, _args: &'a [String]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            PLAIN_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn expect_alice<'a>(
        _state: &'a mut AppState,
        _args: &'a [String],
        user: User,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            assert_eq!(user.name, "alice");
            Ok(())
        })
    }

    async fn setup() -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let state = AppState::new(db, Config::default(), dir.path().join("config.toml"));
        (state, dir)
    }

    #[test]
    fn test_registry_contains_all_commands() {
        let names = Commands::new().names();
        assert_eq!(
            names,
            vec![
                "addfeed", "agg", "browse", "feeds", "follow", "following", "login", "register",
                "reset", "unfollow", "users",
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (mut state, _dir) = setup().await;
        let result = Commands::new().run(&mut state, "frobnicate", &[]).await;
        assert!(matches!(result, Err(GatorError::Validation(msg)) if msg.contains("frobnicate")));
    }

    #[tokio::test]
    async fn test_plain_command_dispatch() {
        let (mut state, _dir) = setup().await;
        let mut commands = Commands::empty();
        commands.register("count", Command::Plain(count_plain));

        let before = PLAIN_CALLS.load(Ordering::SeqCst);
        commands.run(&mut state, "count", &[]).await.unwrap();
        assert_eq!(PLAIN_CALLS.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn test_logged_in_command_requires_user() {
        let (mut state, _dir) = setup().await;
        let mut commands = Commands::empty();
        commands.register("whoami", Command::LoggedIn(expect_alice));

        let result = commands.run(&mut state, "whoami", &[]).await;
        assert!(matches!(result, Err(GatorError::Validation(_))));

        state.config.current_user_name = Some("alice".to_string());
        let result = commands.run(&mut state, "whoami", &[]).await;
        assert!(matches!(result, Err(GatorError::NotFound(_))));

        UserRepository::new(state.db.pool())
            .create(&NewUser::new("alice"))
            .await
            .unwrap();
        commands.run(&mut state, "whoami", &[]).await.unwrap();
    }
}
