/// The `msg-id` values of USERNOTICE lines that become chat messages.
pub struct UserNoticeKind;

impl UserNoticeKind {
  pub const SUB: &str = "sub";
  pub const RESUB: &str = "resub";
  pub const SUB_GIFT: &str = "subgift";
  pub const MYSTERY_GIFT: &str = "submysterygift";
  pub const ANNOUNCEMENT: &str = "announcement";
}

/// IRC commands Twitch sends that aren't part of the standard command set.
pub struct TwitchCommand;

impl TwitchCommand {
  pub const USER_NOTICE: &str = "USERNOTICE";
  pub const CLEAR_MESSAGE: &str = "CLEARMSG";
  pub const CLEAR_CHAT: &str = "CLEARCHAT";
  pub const GLOBAL_USER_STATE: &str = "GLOBALUSERSTATE";
  pub const USER_STATE: &str = "USERSTATE";
}
