/// Language for the system text synthesized from subscription and announcement events.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
  #[default]
  English,
  Portuguese,
}

impl Locale {
  pub fn subscribed(&self, username: &str, plan: Option<&str>) -> String {
    match (self, plan) {
      (Self::English, Some(plan)) => format!("{username} subscribed with {plan}!"),
      (Self::English, None) => format!("{username} subscribed!"),
      (Self::Portuguese, Some(plan)) => format!("{username} se inscreveu com {plan}!"),
      (Self::Portuguese, None) => format!("{username} se inscreveu!"),
    }
  }

  pub fn resubscribed(&self, username: &str, months: Option<u32>) -> String {
    match (self, months) {
      (Self::English, Some(months)) => {
        format!("{username} subscribed for {months} months!")
      }
      (Self::English, None) => format!("{username} resubscribed!"),
      (Self::Portuguese, Some(months)) => {
        format!("{username} está inscrito há {months} meses!")
      }
      (Self::Portuguese, None) => format!("{username} renovou a inscrição!"),
    }
  }

  pub fn gifted_subscription(&self, gifter: &str, recipient: &str) -> String {
    match self {
      Self::English => format!("{gifter} gifted a subscription to {recipient}!"),
      Self::Portuguese => format!("{gifter} presenteou {recipient} com uma inscrição!"),
    }
  }

  pub fn gifted_subscriptions(&self, gifter: &str, count: usize) -> String {
    match (self, count) {
      (Self::English, 1) => format!("{gifter} is gifting 1 subscription!"),
      (Self::English, count) => format!("{gifter} is gifting {count} subscriptions!"),
      (Self::Portuguese, 1) => format!("{gifter} está presenteando 1 inscrição!"),
      (Self::Portuguese, count) => {
        format!("{gifter} está presenteando {count} inscrições!")
      }
    }
  }

  pub fn announcement(&self, username: &str) -> String {
    match self {
      Self::English => format!("Announcement from {username}"),
      Self::Portuguese => format!("Anúncio de {username}"),
    }
  }

  /// The synthesized text with the user's own comment appended, if they wrote one.
  pub fn with_comment(system_text: String, comment: Option<&str>) -> String {
    match comment.map(str::trim).filter(|comment| !comment.is_empty()) {
      Some(comment) => format!("{system_text}: {comment}"),
      None => system_text,
    }
  }
}

impl<S> From<S> for Locale
where
  S: AsRef<str>,
{
  fn from(value: S) -> Self {
    match value.as_ref().trim().to_lowercase().as_str() {
      "pt" | "pt-br" | "pt_br" | "portuguese" => Self::Portuguese,
      _ => Self::English,
    }
  }
}
