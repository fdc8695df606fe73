use once_cell::sync::Lazy;
use regex::Regex;

static START_PAYLOAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^object=(\d+)_realtor=(\d+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InquiryLink {
  pub object_code: String,
  pub realtor_code: String,
}

pub fn start_payload(object_code: &str, realtor_code: &str) -> String {
  format!("object={object_code}_realtor={realtor_code}")
}

/// `https://<host>/<bot>?start=object=<code>_realtor=<realtor>`
pub fn inquiry_url(host: &str, bot_username: &str, object_code: &str, realtor_code: &str) -> String {
  format!(
    "https://{host}/{bot_username}?start={}",
    start_payload(object_code, realtor_code)
  )
}

pub fn parse_start_payload(payload: &str) -> Option<InquiryLink> {
  let captures = START_PAYLOAD.captures(payload.trim())?;
  Some(InquiryLink {
    object_code: captures[1].to_string(),
    realtor_code: captures[2].to_string(),
  })
}
