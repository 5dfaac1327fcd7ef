use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::auth::{AuthClient, SessionStore, UserContext};
use crate::cache::{CacheLayer, CacheStorage, MemoryStorage, NoopStorage, SqliteStorage};
use crate::commands::Command;
use crate::config::Config;
use crate::items::{Item, ItemClient, ItemError, ItemSummary};
use crate::query::{Mutation, Query, QueryState};
use crate::remote::PostgrestClient;

type Items = ItemClient<PostgrestClient, Box<dyn CacheStorage>>;

/// Landing view: totals plus both usage rankings.
#[derive(Debug, Serialize)]
struct Home {
  summary: ItemSummary,
  best: Vec<Item>,
  worst: Vec<Item>,
}

/// Runs one command against the configured backend.
pub struct App {
  config: Config,
  data_dir: PathBuf,
  sessions: SessionStore,
}

impl App {
  pub fn new(config: Config, data_dir: PathBuf) -> Self {
    let sessions = SessionStore::in_dir(&data_dir);
    Self {
      config,
      data_dir,
      sessions,
    }
  }

  fn auth(&self) -> Result<AuthClient> {
    AuthClient::new(&self.config, self.sessions.clone())
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Signin { email } => self.sign_in(&email).await,
      Command::Signout => {
        self.auth()?.sign_out().await?;
        Ok(())
      }
      command => {
        let user = self.auth()?.current_user().await?;
        let items = self.item_client(&user)?;
        run_item_command(items, user, command).await
      }
    }
  }

  async fn sign_in(&self, email: &str) -> Result<()> {
    let password = match Config::get_password() {
      Some(password) => password,
      None => prompt_password()?,
    };
    let session = self.auth()?.sign_in(email, &password).await?;
    print_json(&session.user)
  }

  fn item_client(&self, user: &UserContext) -> Result<Items> {
    let mut remote = PostgrestClient::new(&self.config)?;
    if let Some(token) = &user.access_token {
      remote = remote.with_access_token(token);
    }
    Ok(ItemClient::new(remote, self.cache_layer()?))
  }

  fn cache_layer(&self) -> Result<CacheLayer<Box<dyn CacheStorage>>> {
    let cache = &self.config.cache;
    let storage: Box<dyn CacheStorage> = if !cache.enabled {
      Box::new(NoopStorage)
    } else if cache.persist {
      let path = self.data_dir.join("cache.db");
      debug!(path = %path.display(), "opening query cache");
      Box::new(SqliteStorage::open(&path)?)
    } else {
      Box::new(MemoryStorage::new())
    };
    let stale_seconds = cache.stale_seconds.min(u64::from(u32::MAX)) as i64;
    Ok(CacheLayer::new(storage).with_stale_time(chrono::Duration::seconds(stale_seconds)))
  }
}

async fn run_item_command(items: Items, user: UserContext, command: Command) -> Result<()> {
  match command {
    Command::Genre { key } => print_json(&items.items_by_genre(&user, key.as_deref()).await?),
    Command::Category { key } => {
      print_json(&items.items_by_category(&user, key.as_deref()).await?)
    }
    Command::Best => print_json(&items.best_used_items(&user).await?),
    Command::Worst => print_json(&items.worst_used_items(&user).await?),
    Command::Date { date } => print_json(&items.items_by_date(&user, date).await?),
    Command::Show { key } => print_json(&items.item(&user, key.as_deref()).await?),
    Command::Summary => print_json(&items.summary(&user).await?),
    Command::Genres => print_json(&items.genres(&user).await?),
    Command::Home => print_json(&home(items, user).await?),
    Command::Create { fields, image } => {
      let item = fields.into_new_item(image);
      let created = run_mutation(items, user, item, |items, user, item| async move {
        items.create_item(&user, &item).await
      })
      .await?;
      info!(item_key = %created.key, "item created");
      print_json(&created)
    }
    Command::Update { key, fields } => {
      let patch = fields.into_patch(key);
      let updated = run_mutation(items, user, patch, |items, user, patch| async move {
        items.update_item(&user, &patch).await
      })
      .await?;
      print_json(&updated)
    }
    Command::Delete { key } => {
      run_mutation(items, user, key, |items, user, key| async move {
        items.delete_item(&user, &key).await
      })
      .await?;
      print_json(&serde_json::json!({ "deleted": true }))
    }
    Command::Signin { .. } | Command::Signout => Err(eyre!("not an item command")),
  }
}

/// Load summary and both rankings concurrently.
async fn home(items: Items, user: UserContext) -> Result<Home> {
  let mut summary = {
    let (items, user) = (items.clone(), user.clone());
    Query::new(move || {
      let (items, user) = (items.clone(), user.clone());
      async move { items.summary(&user).await }
    })
  };
  let mut best = {
    let (items, user) = (items.clone(), user.clone());
    Query::new(move || {
      let (items, user) = (items.clone(), user.clone());
      async move { items.best_used_items(&user).await }
    })
  };
  let mut worst = Query::new(move || {
    let (items, user) = (items.clone(), user.clone());
    async move { items.worst_used_items(&user).await }
  });

  summary.fetch();
  best.fetch();
  worst.fetch();
  futures::join!(summary.settle(), best.settle(), worst.settle());

  Ok(Home {
    summary: settled(summary.into_state())?,
    best: settled(best.into_state())?,
    worst: settled(worst.into_state())?,
  })
}

async fn run_mutation<P, T, F, Fut>(items: Items, user: UserContext, params: P, write: F) -> Result<T>
where
  P: Send + 'static,
  T: Send + 'static,
  F: Fn(Items, UserContext, P) -> Fut + Send + Sync + 'static,
  Fut: std::future::Future<Output = Result<T, ItemError>> + Send + 'static,
{
  let mut mutation = Mutation::new(move |params| write(items.clone(), user.clone(), params));
  mutation.mutate(params);
  mutation.settle().await;
  settled(mutation.into_state())
}

fn settled<T>(state: QueryState<T, ItemError>) -> Result<T> {
  match state {
    QueryState::Success(data) => Ok(data),
    QueryState::Error(e) => Err(e.into()),
    QueryState::Cancelled => Err(eyre!("request cancelled")),
    QueryState::Idle | QueryState::Loading => Err(eyre!("request did not finish")),
  }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  let out = serde_json::to_string_pretty(value)?;
  println!("{}", out);
  Ok(())
}

fn prompt_password() -> Result<String> {
  eprint!("Password: ");
  std::io::stderr().flush()?;
  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\r', '\n']).to_string();
  if password.is_empty() {
    return Err(eyre!("Password is required"));
  }
  Ok(password)
}
