use crate::{cmd::Cmd, dispatch::Dispatch};

/// The trait that defines a program following the Elm Architecture.
///
/// A program is its own model. It is created by [`init`](Program::init), changed
/// only by [`update`](Program::update), and describes side effects as [`Cmd`]
/// values instead of performing them.
///
/// # Type Parameters
///
/// * `Message` - The type of messages the program handles. Must be `Send + 'static`.
/// * `Flags` - Data passed to [`init`](Program::init).
///
/// # Example
///
/// ```
/// use elmish::{cmd::Cmd, program::Program};
///
/// #[derive(Debug, Clone)]
/// enum Message {
///     Increment,
///     Decrement,
/// }
///
/// struct Counter {
///     value: i32,
/// }
///
/// impl Program for Counter {
///     type Message = Message;
///     type Flags = i32; // Initial value
///
///     fn init(initial: i32) -> (Self, Cmd<Message>) {
///         (Counter { value: initial }, Cmd::none())
///     }
///
///     fn update(&mut self, msg: Message) -> Cmd<Message> {
///         match msg {
///             Message::Increment => self.value += 1,
///             Message::Decrement => self.value -= 1,
///         }
///         Cmd::none()
///     }
/// }
/// ```
pub trait Program: Sized {
    /// The type of messages your program processes.
    ///
    /// Messages represent every event that can change the model. They come from
    /// commands, subscriptions, or whoever holds a [`Dispatch`].
    type Message: Send + 'static;

    /// Initialization data for the program.
    ///
    /// Use `()` if no configuration is needed.
    type Flags;

    /// Create the initial model and the command to run once it is committed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use elmish::{cmd::Cmd, program::Program};
    /// # struct MyApp { loaded: Option<String> }
    /// # enum Message { Loaded(String), Failed(std::io::Error) }
    /// # impl Program for MyApp {
    /// #     type Message = Message;
    /// #     type Flags = std::path::PathBuf;
    /// fn init(path: std::path::PathBuf) -> (Self, Cmd<Message>) {
    ///     let cmd = Cmd::of_func(std::fs::read_to_string, path, Message::Loaded, Message::Failed);
    ///     (MyApp { loaded: None }, cmd)
    /// }
    /// #     fn update(&mut self, _msg: Message) -> Cmd<Message> { Cmd::none() }
    /// # }
    /// ```
    fn init(flags: Self::Flags) -> (Self, Cmd<Self::Message>);

    /// Process a message and return the effects to run afterwards.
    ///
    /// All state changes happen here. The runtime commits the new state before
    /// running the returned command, so messages dispatched synchronously by that
    /// command see the updated model.
    fn update(&mut self, msg: Self::Message) -> Cmd<Self::Message>;

    /// Describe long-lived event sources.
    ///
    /// Called once, with the initial model, right after the init command has run.
    fn subscribe(&self) -> Cmd<Self::Message> {
        Cmd::none()
    }

    /// Observe the committed model.
    ///
    /// Called after initialization and after every update. Renderers hook in here;
    /// the `dispatch` handle can be stored to wire user input back into the loop.
    /// This method should only read from `self`.
    fn view(&self, _dispatch: &Dispatch<Self::Message>) {}
}
