//! Command-line subcommands.

use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::items::{ImageRef, ItemFields, ItemPatch, NewItem};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
  /// Sign in with email and password (password from ITEMLOG_PASSWORD or stdin)
  Signin {
    #[arg(long)]
    email: String,
  },
  /// Forget the stored session
  Signout,
  /// Items in a genre
  #[command(visible_alias = "g")]
  Genre { key: Option<String> },
  /// Items in a category
  #[command(visible_alias = "c")]
  Category { key: Option<String> },
  /// The six most used items
  Best,
  /// The six least used items
  Worst,
  /// Items used on a day (YYYY-MM-DD)
  #[command(visible_alias = "d")]
  Date { date: Option<NaiveDate> },
  /// One item by key
  #[command(visible_alias = "s")]
  Show { key: Option<String> },
  /// Totals over all items
  Summary,
  /// Genres with item counts
  Genres,
  /// Summary plus best and worst used items
  Home,
  /// Create an item
  Create {
    #[command(flatten)]
    fields: FieldArgs,
    /// Picture of the item, kept as a reference only
    #[arg(long)]
    image: Option<String>,
  },
  /// Replace the settable fields of an item
  Update {
    key: String,
    #[command(flatten)]
    fields: FieldArgs,
  },
  /// Delete an item
  #[command(visible_alias = "rm")]
  Delete { key: String },
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct FieldArgs {
  #[arg(long)]
  pub genre: String,
  #[arg(long)]
  pub category: String,
  #[arg(long)]
  pub brand: String,
  #[arg(long, default_value = "")]
  pub size: String,
  #[arg(long, value_parser = parse_price)]
  pub price: f64,
  /// Purchase date (YYYY-MM-DD)
  #[arg(long)]
  pub purchase_date: NaiveDate,
  /// Uses before tracking started
  #[arg(long, default_value_t = 0)]
  pub initial_use_count: u32,
}

fn parse_price(raw: &str) -> Result<f64, String> {
  let price: f64 = raw.trim().parse().map_err(|e| format!("{}", e))?;
  if !price.is_finite() || price < 0.0 {
    return Err("must be a finite, non-negative number".to_string());
  }
  Ok(price)
}

impl From<FieldArgs> for ItemFields {
  fn from(args: FieldArgs) -> Self {
    ItemFields {
      genre_key: args.genre,
      category_key: args.category,
      brand: args.brand,
      size: args.size,
      price: args.price,
      purchase_date: args.purchase_date,
      initial_use_count: args.initial_use_count,
    }
  }
}

impl FieldArgs {
  pub fn into_new_item(self, image: Option<String>) -> NewItem {
    NewItem {
      fields: self.into(),
      image: image.map(ImageRef),
    }
  }

  pub fn into_patch(self, key: String) -> ItemPatch {
    ItemPatch {
      key,
      fields: self.into(),
    }
  }
}
