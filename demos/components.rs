//! Two independent child components reused by a parent through `Cmd::map`.

use std::time::Duration;

use color_eyre::eyre::Result;
use elmish::prelude::*;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod search {
    use std::time::Duration;

    use elmish::prelude::*;
    use tokio::time::sleep;

    #[derive(Debug, Clone)]
    pub enum Message {
        Query(String),
        Results(Vec<String>),
        Failed(String),
    }

    #[derive(Debug, Default)]
    pub struct Model {
        pub results: Vec<String>,
        pub error: Option<String>,
    }

    async fn search(query: String) -> Result<Vec<String>, String> {
        sleep(Duration::from_millis(30)).await;
        if query.is_empty() {
            return Err("empty query".to_string());
        }
        Ok((1..=3).map(|n| format!("{query} #{n}")).collect())
    }

    impl Model {
        pub fn update(&mut self, msg: Message) -> Cmd<Message> {
            match msg {
                Message::Query(query) => {
                    Cmd::of_promise(search, query, Message::Results, Message::Failed)
                }
                Message::Results(results) => {
                    self.results = results;
                    self.error = None;
                    Cmd::none()
                }
                Message::Failed(error) => {
                    self.error = Some(error);
                    Cmd::none()
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Message {
    Books(search::Message),
    Movies(search::Message),
}

#[derive(Debug, Default)]
struct Library {
    books: search::Model,
    movies: search::Model,
}

impl Program for Library {
    type Message = Message;
    type Flags = ();

    fn init(_: ()) -> (Self, Cmd<Message>) {
        let cmd = Cmd::batch([
            Cmd::of_msg(search::Message::Query("rust".to_string())).map(Message::Books),
            Cmd::of_msg(search::Message::Query(String::new())).map(Message::Movies),
        ]);
        (Self::default(), cmd)
    }

    fn update(&mut self, msg: Message) -> Cmd<Message> {
        match msg {
            Message::Books(msg) => self.books.update(msg).map(Message::Books),
            Message::Movies(msg) => self.movies.update(msg).map(Message::Movies),
        }
    }

    fn view(&self, _dispatch: &Dispatch<Message>) {
        info!(
            books = ?self.books.results,
            movies_error = ?self.movies.error,
            "view"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let runtime = Runtime::<Library>::new(());
    let token = runtime.shutdown_token();
    tokio::spawn(async move {
        sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let library = runtime.run().await?;
    println!("books: {:?}", library.books.results);
    println!("movies: {:?}", library.movies.error);
    Ok(())
}
