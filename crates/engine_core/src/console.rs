//! Named commands sent to the running app (e.g. over adb)

use thiserror::Error;

pub type ConsoleFn<T> = fn(&mut T, &str);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("console command '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("unknown console command '{0}'")]
    UnknownCommand(String),
}

struct ConsoleFunction<T> {
    name: String,
    function: ConsoleFn<T>,
}

/// Command registry; names compare case-insensitively
pub struct Console<T> {
    functions: Vec<ConsoleFunction<T>>,
}

impl<T> Default for Console<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Console<T> {
    pub fn new() -> Self {
        Self { functions: Vec::new() }
    }

    /// Add a command
    ///
    /// Registering a name twice is a programming error: debug builds panic,
    /// release builds log it and return [`ConsoleError::AlreadyRegistered`].
    pub fn register(&mut self, name: &str, function: ConsoleFn<T>) -> Result<(), ConsoleError> {
        if self.functions.iter().any(|f| f.name.eq_ignore_ascii_case(name)) {
            tracing::error!("console function '{name}' is already registered");
            debug_assert!(false, "console function '{name}' is already registered");
            return Err(ConsoleError::AlreadyRegistered(name.to_string()));
        }
        tracing::info!("registered console function '{name}'");
        self.functions.push(ConsoleFunction {
            name: name.to_string(),
            function,
        });
        Ok(())
    }

    /// Run `"name parms"`; everything after the first space is passed through
    pub fn execute(&self, target: &mut T, command: &str) -> Result<(), ConsoleError> {
        tracing::info!("received console command \"{command}\"");
        let (name, parms) = command.split_once(' ').unwrap_or((command, ""));

        match self.functions.iter().find(|f| f.name.eq_ignore_ascii_case(name)) {
            Some(f) => {
                tracing::debug!("executing console function '{name}' ({parms})");
                (f.function)(target, parms);
                Ok(())
            }
            None => {
                tracing::error!("unknown console command '{name}'");
                Err(ConsoleError::UnknownCommand(name.to_string()))
            }
        }
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.name.as_str())
    }

    pub fn clear(&mut self) {
        self.functions.clear();
    }
}

/// Echo the parameters to the log
pub fn debug_print<T>(_target: &mut T, parms: &str) {
    tracing::info!(target: "console", "{parms}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct App {
        log: Vec<String>,
    }

    fn record(app: &mut App, parms: &str) {
        app.log.push(parms.to_string());
    }

    #[test]
    fn test_dispatch_is_case_insensitive_and_splits_once() {
        let mut console = Console::new();
        console.register("showFPS", record).expect("register");
        let mut app = App::default();

        console.execute(&mut app, "SHOWFPS on now").expect("execute");
        console.execute(&mut app, "showfps").expect("execute");
        assert_eq!(app.log, vec!["on now".to_string(), String::new()]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration_panics() {
        let mut console: Console<App> = Console::new();
        console.register("stats", debug_print).expect("register");
        let _ = console.register("STATS", record);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_duplicate_registration() {
        let mut console: Console<App> = Console::new();
        console.register("print", debug_print).expect("register");
        assert_eq!(
            console.register("PRINT", record),
            Err(ConsoleError::AlreadyRegistered("PRINT".to_string()))
        );
        assert_eq!(console.commands().count(), 1);
    }

    #[test]
    fn test_unknown_command() {
        let mut console: Console<App> = Console::new();
        console.register("print", debug_print).expect("register");
        let mut app = App::default();
        assert_eq!(
            console.execute(&mut app, "reload shaders"),
            Err(ConsoleError::UnknownCommand("reload".to_string()))
        );
        console.clear();
        assert_eq!(console.commands().count(), 0);
    }
}
