//! HTML rendering for the challenge page.
//!
//! Both pages are embedded and parsed once at startup into literal and
//! placeholder segments, so a broken template fails before serving begins.

use warden_common::WardenError;

const FULL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta http-equiv="Cache-Control" content="no-cache, no-store, must-revalidate">
    <title>CAPTCHA</title>
    <style>
      * {
        box-sizing: border-box;
      }
      .container {
        margin: auto;
        max-width: 320px;
        font-family: sans-serif;
      }
      .container h2 {
        text-align: center;
      }
      .container img {
        display: block;
        width: 320px;
        height: 100px;
      }
      form.captcha input[type="text"] {
        text-align: center;
        text-transform: uppercase;
        padding: 10px;
        font-size: 17px;
        border: 1px solid grey;
        float: left;
        width: 74%;
        background: #f1f1f1;
      }
      form.captcha button {
        float: left;
        width: 26%;
        padding: 10px;
        background: #2196F3;
        color: white;
        font-size: 17px;
        border: 1px solid grey;
        border-left: none;
        cursor: pointer;
      }
      form.captcha button:hover {
        background: #0b7dda;
      }
      form.captcha::after {
        content: "";
        clear: both;
        display: table;
      }
    </style>
  </head>
  <body>
    <div class="container">
      <h2>CAPTCHA</h2>
      <p>Please verify that you are not a robot.</p>
      <img id="{{ImageID}}" src="data:image/jpeg;base64,{{Base64}}" alt="CAPTCHA">
      <form class="captcha" method="POST" action="/">
        <input type="hidden" name="{{ChallengeKey}}" value="{{TextHash}}">
        <input type="text" name="{{ResponseKey}}" minlength="6" maxlength="6" pattern="[A-Za-z0-9]{6}" value="" autocomplete="off" autofocus required>
        <button type="submit">VERIFY</button>
      </form>
    </div>
  </body>
</html>
"#;

const LITE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <title>CAPTCHA</title>
  </head>
  <body>
    <img id="{{ImageID}}" src="data:image/jpeg;base64,{{Base64}}" alt="CAPTCHA">
    <form method="POST" action="/">
      <input type="hidden" name="{{ChallengeKey}}" value="{{TextHash}}">
      <input type="text" name="{{ResponseKey}}" maxlength="6" autocomplete="off" autofocus>
      <input type="submit" value="VERIFY">
    </form>
  </body>
</html>
"#;

/// Values substituted into a page
#[derive(Debug, Clone, Copy)]
pub struct PageData<'a> {
    pub base64: &'a str,
    pub text_hash: &'a str,
    pub challenge_key: &'a str,
    pub response_key: &'a str,
    pub image_id: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Base64,
    TextHash,
    ChallengeKey,
    ResponseKey,
    ImageId,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Base64" => Some(Self::Base64),
            "TextHash" => Some(Self::TextHash),
            "ChallengeKey" => Some(Self::ChallengeKey),
            "ResponseKey" => Some(Self::ResponseKey),
            "ImageID" => Some(Self::ImageId),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Base64 => "Base64",
            Self::TextHash => "TextHash",
            Self::ChallengeKey => "ChallengeKey",
            Self::ResponseKey => "ResponseKey",
            Self::ImageId => "ImageID",
        }
    }

    fn value<'a>(&self, data: &PageData<'a>) -> &'a str {
        match self {
            Self::Base64 => data.base64,
            Self::TextHash => data.text_hash,
            Self::ChallengeKey => data.challenge_key,
            Self::ResponseKey => data.response_key,
            Self::ImageId => data.image_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed page template
#[derive(Debug, Clone)]
pub struct Template {
    name: &'static str,
    segments: Vec<Segment>,
}

impl Template {
    /// Split `source` into literals and `{{Field}}` placeholders
    pub fn parse(name: &'static str, source: &str) -> Result<Self, WardenError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| {
                WardenError::Render(format!("{name}: unterminated placeholder"))
            })?;

            let field_name = after[..close].trim();
            let field = Field::from_name(field_name).ok_or_else(|| {
                WardenError::Render(format!("{name}: unknown field {field_name:?}"))
            })?;
            segments.push(Segment::Field(field));
            rest = &after[close + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { name, segments })
    }

    /// Substitute `data`, HTML-escaping every value
    pub fn render(&self, data: &PageData<'_>) -> Result<String, WardenError> {
        let mut out = String::with_capacity(data.base64.len() + 4096);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => {
                    let value = field.value(data);
                    if value.is_empty() {
                        return Err(WardenError::Render(format!(
                            "{}: empty value for {}",
                            self.name,
                            field.name()
                        )));
                    }
                    push_escaped(&mut out, value);
                }
            }
        }

        Ok(out)
    }
}

/// Full and lite challenge pages
#[derive(Debug, Clone)]
pub struct Pages {
    full: Template,
    lite: Template,
}

impl Pages {
    pub fn new() -> Result<Self, WardenError> {
        Ok(Self {
            full: Template::parse("full", FULL_TEMPLATE)?,
            lite: Template::parse("lite", LITE_TEMPLATE)?,
        })
    }

    pub fn render(&self, lite: bool, data: &PageData<'_>) -> Result<String, WardenError> {
        if lite {
            self.lite.render(data)
        } else {
            self.full.render(data)
        }
    }
}

fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> PageData<'static> {
        PageData {
            base64: "/9j/4AAQSkZJRg==",
            text_hash: "e3eb94fa12bd48c490de3a5c24e22c3842dc4336cbe6c3ea597452e800146ca2",
            challenge_key: "challenge",
            response_key: "response",
            image_id: "img",
        }
    }

    #[test]
    fn test_builtin_templates_parse() {
        assert!(Pages::new().is_ok());
    }

    #[test]
    fn test_render_full_and_lite() {
        let pages = Pages::new().unwrap();

        let full = pages.render(false, &data()).unwrap();
        assert!(full.contains("<form"));
        assert!(full.contains("<style>"));
        assert!(full.contains(r#"name="challenge" value="e3eb94fa"#));
        assert!(full.contains("base64,/9j/4AAQSkZJRg=="));
        assert!(!full.contains("{{"));

        let lite = pages.render(true, &data()).unwrap();
        assert!(lite.contains("<form"));
        assert!(!lite.contains("<style>"));
        assert!(lite.contains(r#"name="response""#));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Template::parse("t", "<p>{{Base64</p>"),
            Err(WardenError::Render(_))
        ));
        assert!(matches!(
            Template::parse("t", "<p>{{Text}}</p>"),
            Err(WardenError::Render(_))
        ));
    }

    #[test]
    fn test_render_escapes_values() {
        let template = Template::parse("t", r#"<input name="{{ChallengeKey}}">"#).unwrap();
        let page = template
            .render(&PageData {
                challenge_key: r#""><script>"#,
                ..data()
            })
            .unwrap();
        assert_eq!(page, r#"<input name="&#34;&gt;&lt;script&gt;">"#);
    }

    #[test]
    fn test_render_rejects_empty_value() {
        let pages = Pages::new().unwrap();
        let result = pages.render(false, &PageData { base64: "", ..data() });
        assert!(matches!(result, Err(WardenError::Render(_))));
    }
}
