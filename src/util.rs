use crate::param::status_text;

/// 为错误状态码生成一个独立的小页面，不依赖模板缓存，
/// 模板缓存本身出问题时也能正常返回。
pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    pub fn from_status_code(code: u16) -> Self {
        let title = format!("{} {}", code, status_text(code).unwrap_or("Unknown Status"));
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        let description = status_text(code).unwrap_or("Unknown Status");
        let body = format!(
            r"
            <h1>{}</h1>
            <p>{}</p>
            ",
            code, description
        );
        Self { title, css, body }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
            <html>
                <head>
                    <meta charset="utf-8">
                    <title>{}</title>
                    <style>{}</style>
                </head>
                <body>
                {}
                </body>
            </html>"##,
            self.title, self.css, self.body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_builder_from_status_code() {
        let html = HtmlBuilder::from_status_code(404).build();
        assert!(html.contains("404"));
        assert!(html.contains("<p>Not Found</p>"));
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("</html>"));
    }

    #[test]
    fn test_html_builder_uses_status_text() {
        let html = HtmlBuilder::from_status_code(500).build();
        assert!(html.contains("<title>500 Internal Server Error</title>"));
        assert!(html.contains("<p>Internal Server Error</p>"));
    }

    #[test]
    fn test_html_builder_unknown_code() {
        let html = HtmlBuilder::from_status_code(599).build();
        assert!(html.contains("Unknown Status"));
    }

    #[test]
    fn test_html_builder_various_codes() {
        for code in [400, 404, 405, 413, 422, 500] {
            let html = HtmlBuilder::from_status_code(code).build();
            assert!(html.contains(&code.to_string()));
            assert!(html.contains("charset=\"utf-8\""));
        }
    }
}
