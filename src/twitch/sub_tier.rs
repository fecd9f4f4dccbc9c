#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubTier {
  Unknown,
  One,
  Two,
  Three,
  Prime,
}

impl SubTier {
  /// How the plan is named in the synthesized subscription text. None when unknown.
  pub fn plan_name(&self) -> Option<&'static str> {
    match self {
      SubTier::One => Some("Tier 1"),
      SubTier::Two => Some("Tier 2"),
      SubTier::Three => Some("Tier 3"),
      SubTier::Prime => Some("Prime"),
      SubTier::Unknown => None,
    }
  }
}

impl From<&str> for SubTier {
  fn from(value: &str) -> SubTier {
    match value {
      "1000" => SubTier::One,
      "2000" => SubTier::Two,
      "3000" => SubTier::Three,
      "Prime" => SubTier::Prime,
      _ => SubTier::Unknown,
    }
  }
}

struct SubTierVisitor;

impl<'de> serde::Deserialize<'de> for SubTier {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    deserializer.deserialize_str(SubTierVisitor)
  }
}

impl serde::de::Visitor<'_> for SubTierVisitor {
  type Value = SubTier;

  fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    formatter.write_str("a string like \"1000\", \"2000\", \"3000\", or \"Prime\"")
  }

  fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
  where
    E: serde::de::Error,
  {
    Ok(SubTier::from(value))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plans_map_to_names() {
    assert_eq!(SubTier::from("1000").plan_name(), Some("Tier 1"));
    assert_eq!(SubTier::from("Prime").plan_name(), Some("Prime"));
    assert_eq!(SubTier::from("9000").plan_name(), None);
  }
}
