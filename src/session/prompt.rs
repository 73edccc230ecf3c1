//! Interactive credential prompting
// (c) 2024 Ross Younger

use std::io;

use console::Term;

/// Answers the questions a transport may need to ask while setting up a session.
///
/// An implementation is handed to [`Transport::connect`](super::Transport::connect);
/// nothing else ever consults it.
pub trait CredentialPrompt {
    /// Asks for the passphrase of a private key
    fn passphrase(&mut self, message: &str) -> io::Result<String>;
    /// Asks for an account password
    fn password(&mut self, message: &str) -> io::Result<String>;
    /// Asks a yes/no question
    fn yes_no(&mut self, message: &str) -> io::Result<bool>;
    /// Tells the user something
    fn show_message(&mut self, message: &str);
}

/// Line-oriented terminal access
pub trait Console {
    /// Shows `prompt` and reads a line
    fn read(&mut self, prompt: &str) -> io::Result<String>;
    /// Shows `prompt` and reads a line without echo
    fn read_secure(&mut self, prompt: &str) -> io::Result<String>;
    /// Writes a line
    fn print(&mut self, message: &str);
}

/// [`Console`] on the process's controlling terminal (via stderr, so stdout stays clean)
#[derive(Debug, Clone)]
pub struct TermConsole {
    term: Term,
}

impl Default for TermConsole {
    fn default() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Console for TermConsole {
    fn read(&mut self, prompt: &str) -> io::Result<String> {
        self.term.write_str(prompt)?;
        self.term.read_line()
    }

    fn read_secure(&mut self, prompt: &str) -> io::Result<String> {
        self.term.write_str(prompt)?;
        self.term.read_secure_line()
    }

    fn print(&mut self, message: &str) {
        let _ = self.term.write_line(message);
    }
}

/// [`CredentialPrompt`] that asks the questions on a [`Console`]
#[derive(Debug, Clone, Default)]
pub struct ConsolePrompt<C: Console> {
    console: C,
}

impl<C: Console> ConsolePrompt<C> {
    /// Constructor
    pub fn new(console: C) -> Self {
        Self { console }
    }
}

fn beautify(message: &str) -> String {
    format!("{message}: ")
}

impl<C: Console> CredentialPrompt for ConsolePrompt<C> {
    fn passphrase(&mut self, message: &str) -> io::Result<String> {
        self.console.read_secure(&beautify(message))
    }

    fn password(&mut self, message: &str) -> io::Result<String> {
        self.console.read_secure(&beautify(message))
    }

    fn yes_no(&mut self, message: &str) -> io::Result<bool> {
        let answer = self.console.read(&beautify(message))?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }

    fn show_message(&mut self, message: &str) {
        self.console.print(message);
    }
}

#[cfg(test)]
mod test {
    use std::{collections::VecDeque, io};

    use super::{Console, ConsolePrompt, CredentialPrompt};

    #[derive(Debug, Default)]
    struct Scripted {
        answers: VecDeque<&'static str>,
        prompts: Vec<(bool, String)>,
        printed: Vec<String>,
    }

    impl Scripted {
        fn answering(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                ..Self::default()
            }
        }
        fn next(&mut self) -> io::Result<String> {
            self.answers
                .pop_front()
                .map(str::to_owned)
                .ok_or_else(|| io::ErrorKind::UnexpectedEof.into())
        }
    }

    impl Console for Scripted {
        fn read(&mut self, prompt: &str) -> io::Result<String> {
            self.prompts.push((false, prompt.to_owned()));
            self.next()
        }
        fn read_secure(&mut self, prompt: &str) -> io::Result<String> {
            self.prompts.push((true, prompt.to_owned()));
            self.next()
        }
        fn print(&mut self, message: &str) {
            self.printed.push(message.to_owned());
        }
    }

    #[test]
    fn passphrase_is_read_securely() {
        let mut uut = ConsolePrompt::new(Scripted::answering(&["hunter2"]));
        assert_eq!(uut.passphrase("Passphrase for key").unwrap(), "hunter2");
        assert_eq!(
            uut.console.prompts,
            vec![(true, "Passphrase for key: ".to_owned())]
        );
    }

    #[test]
    fn password_is_read_securely() {
        let mut uut = ConsolePrompt::new(Scripted::answering(&["secret"]));
        assert_eq!(uut.password("Password").unwrap(), "secret");
        assert_eq!(uut.console.prompts, vec![(true, "Password: ".to_owned())]);
    }

    #[test]
    fn yes_no_answers() {
        let mut uut = ConsolePrompt::new(Scripted::answering(&["y", "Y", "n", "yes", ""]));
        assert!(uut.yes_no("Continue?").unwrap());
        assert!(uut.yes_no("Continue?").unwrap());
        assert!(!uut.yes_no("Continue?").unwrap());
        assert!(!uut.yes_no("Continue?").unwrap());
        assert!(!uut.yes_no("Continue?").unwrap());
        assert!(uut.console.prompts.iter().all(|(secure, p)| !secure && p == "Continue?: "));
    }

    #[test]
    fn message_printed_verbatim() {
        let mut uut = ConsolePrompt::new(Scripted::default());
        uut.show_message("Welcome to the machine");
        assert_eq!(uut.console.printed, vec!["Welcome to the machine"]);
        assert!(uut.console.prompts.is_empty());
    }

    #[test]
    fn console_failure_propagates() {
        let mut uut = ConsolePrompt::new(Scripted::default());
        assert!(uut.yes_no("anything").is_err());
    }
}
