//! Templates for reflowable documents and notification bodies.

use minijinja::{Environment, context};

use crate::error::Result;

use super::assembler::CoverSheet;

/// Cover page of an EPUB.
pub const COVER_TEMPLATE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{{ lang }}" xml:lang="{{ lang }}">
<head>
    <meta charset="utf-8"/>
    <title>{{ cover.title }}</title>
    <link rel="stylesheet" type="text/css" href="stylesheet.css"/>
</head>
<body class="lessonexport-cover">
    {% if logo %}<div class="lessonexport-logo"><img src="{{ logo }}" alt=""/></div>{% endif %}
    <div class="lessonexport-banner" style="background-color: {{ accent }};">
        <h1>{{ cover.title }}</h1>
    </div>
    {% if cover.description_html %}<div class="lessonexport-description">{{ cover.description_html|safe }}</div>{% endif %}
    {% if cover.info_lines %}
    <div class="lessonexport-info">
        {% for line in cover.info_lines %}<p>{{ line }}</p>{% endfor %}
    </div>
    {% endif %}
</body>
</html>
"##;

/// One lesson page of an EPUB. `body` is already XHTML.
pub const PAGE_TEMPLATE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{{ lang }}" xml:lang="{{ lang }}">
<head>
    <meta charset="utf-8"/>
    <title>{{ title }}</title>
    <link rel="stylesheet" type="text/css" href="stylesheet.css"/>
</head>
<body>
    <section id="{{ anchor }}" epub:type="chapter">
        <h2>{{ title }}</h2>
        {{ body|safe }}
    </section>
</body>
</html>
"##;

/// Base stylesheet; site CSS is appended after it.
pub const BASE_STYLESHEET: &str = r#"body { font-family: sans-serif; line-height: 1.4; }
h1, h2, h3 { line-height: 1.2; }
img { max-width: 100%; }
.lessonexport-cover { text-align: center; }
.lessonexport-banner { color: #ffffff; padding: 1.5em 1em; margin: 2em 0; }
.lessonexport-banner h1 { margin: 0; }
.lessonexport-description { text-align: left; margin: 1em 2em; }
.lessonexport-info { font-size: 0.85em; margin-top: 3em; }
.lessonexport-answers { border-top: 1px solid #cccccc; margin-top: 1em; padding-top: 0.5em; }
.lessonexport-answer { margin: 0.25em 0; padding-left: 1em; }
"#;

const FAILURE_TEMPLATE: &str = "\
The scheduled export of the lesson \"{{ lesson }}\" has failed {{ attempts }} times.
It will be tried once more; if that attempt fails too, the lesson stays in the
queue until one of its pages is edited again.
";

const PUBLISH_TEMPLATE: &str = "\
The lesson \"{{ lesson }}\" has changed. The updated export is attached as {{ filename }}.
";

/// Renders the EPUB cover page.
pub fn render_cover(
    cover: &CoverSheet,
    accent: (u8, u8, u8),
    logo: Option<&str>,
    lang: &str,
) -> Result<String> {
    let (r, g, b) = accent;
    let mut env = Environment::new();
    env.add_template("cover.xml", COVER_TEMPLATE)?;
    let tmpl = env.get_template("cover.xml")?;

    Ok(tmpl.render(context! {
        cover => cover,
        accent => format!("#{r:02x}{g:02x}{b:02x}"),
        logo => logo,
        lang => lang,
    })?)
}

/// Renders one EPUB page around already-serialised XHTML.
pub fn render_page(title: &str, anchor: &str, body: &str, lang: &str) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("page.xml", PAGE_TEMPLATE)?;
    let tmpl = env.get_template("page.xml")?;

    Ok(tmpl.render(context! {
        title => title,
        anchor => anchor,
        body => body,
        lang => lang,
    })?)
}

/// Base stylesheet followed by the configured site CSS.
pub fn stylesheet(custom: Option<&str>) -> String {
    match custom.map(str::trim).filter(|css| !css.is_empty()) {
        Some(css) => format!("{BASE_STYLESHEET}\n{css}\n"),
        None => BASE_STYLESHEET.to_string(),
    }
}

/// Body of the message sent before a lesson's last export attempt.
pub fn failure_body(lesson: &str, attempts: u32) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(FAILURE_TEMPLATE, context! { lesson => lesson, attempts => attempts })?)
}

/// Body of the message carrying a scheduled export.
pub fn publish_body(lesson: &str, filename: &str) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(PUBLISH_TEMPLATE, context! { lesson => lesson, filename => filename })?)
}
