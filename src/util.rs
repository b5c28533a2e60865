// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::{io, path::Path};

use crate::{
    balancer::Backend,
    param::{NOT_FOUND_DELAY_MS, NOT_FOUND_REDIRECT},
};

pub struct HtmlBuilder {
    title: String,
    meta: String,
    css: String,
    script: String,
    body: String,
}

impl HtmlBuilder {
    fn with_title(title: &str) -> Self {
        Self {
            title: title.to_string(),
            meta: "".to_string(),
            css: "".to_string(),
            script: "".to_string(),
            body: "".to_string(),
        }
    }

    // 404页面：倒计时结束后用 replace 跳转，浏览器的后退按钮不会回到这个页面
    pub fn not_found() -> Self {
        let mut builder = Self::with_title("404 Not Found");
        builder.script = format!(
            "window.setTimeout(function(){{ window.location.replace('{}'); }},{})",
            NOT_FOUND_REDIRECT, NOT_FOUND_DELAY_MS
        );
        builder.body = format!(
            r#"The requested file could not be found on the server. Click <a href=".{}">here</a> to go to home page.
            <p>You will be automatically redirected in {} seconds.</p>"#,
            NOT_FOUND_REDIRECT,
            NOT_FOUND_DELAY_MS / 1000
        );
        builder
    }

    // 调度器返回的跳转页面
    pub fn redirect(backend: &Backend) -> Self {
        let mut builder = Self::with_title("Redirecting");
        builder.meta = format!(
            "<meta http-equiv='refresh' content='0;http://{}'>",
            escape_html(&backend.to_string())
        );
        builder
    }

    // 搜索结果页面，每个匹配的文件以内联图片的形式列出
    pub fn search_results(term: &str, dir_href: &str, names: &[String]) -> Self {
        let mut builder = Self::with_title(&format!("Results for {}", escape_html(term)));
        builder.css = r"
            img {
                height: 300px;
            }"
        .to_string();
        let mut body = format!("<h1>Results for {}</h1>\n", escape_html(term));
        for name in names {
            let name = escape_html(name);
            body.push_str(&format!(
                "<img src=\"./{}/{}\" alt=\"{}\"></br>\n",
                dir_href, name, name
            ));
        }
        builder.body = body;
        builder
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
            <!-- 本文件由memserve自动生成 -->
            <html>
                <head>
                    <meta charset="utf-8">
                    {}
                    <script>{}</script>
                    <title>{}</title>
                    <style>{}</style>
                </head>
                <body>
                {}
                </body>
            </html>"##,
            self.meta, self.script, self.title, self.css, self.body
        )
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 从请求目标中提取搜索关键字。
///
/// 目标中出现 `=` 时取第一个 `=` 之后的全部内容，转为小写并去掉 `+`；否则不是搜索请求。
pub fn search_term(target: &str) -> Option<String> {
    let (_, query) = target.split_once('=')?;
    Some(query.to_lowercase().replace('+', ""))
}

/// 列出目录中文件名包含关键字（不区分大小写）的普通文件，按名称排序。
///
/// 目录不存在时视为没有任何匹配。
pub async fn find_images(dir: &Path, term: &str) -> io::Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let term = term.to_lowercase();
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.to_lowercase().contains(&term) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_search_term() {
        assert_eq!(search_term("/index.html?q=Cat+Pics"), Some("catpics".to_string()));
        assert_eq!(search_term("/?search=dog"), Some("dog".to_string()));
        assert_eq!(search_term("/?a=b=c"), Some("b=c".to_string()));
        assert_eq!(search_term("/?q="), Some("".to_string()));
        assert_eq!(search_term("/index.html"), None);
        assert_eq!(search_term("/page?flag"), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>"x" & 'y'</script>"#),
            "&lt;script&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/script&gt;"
        );
        assert_eq!(escape_html("plain.png"), "plain.png");
    }

    #[test]
    fn test_html_builder_structure() {
        let html = HtmlBuilder::not_found().build();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<html>"));
        assert!(html.contains("</html>"));
        assert!(html.contains("<title>404 Not Found</title>"));
        assert!(html.contains("charset=\"utf-8\""));
    }

    #[test]
    fn test_not_found_redirects_after_three_seconds() {
        let html = HtmlBuilder::not_found().build();
        assert!(html.contains(
            "window.setTimeout(function(){ window.location.replace('/index.html'); },3000)"
        ));
        assert!(html.contains("redirected in 3 seconds"));
    }

    #[test]
    fn test_redirect_meta_refresh() {
        let backend: Backend = "maple.example.edu:12430".parse().unwrap();
        let html = HtmlBuilder::redirect(&backend).build();
        assert!(html.contains("<meta http-equiv='refresh' content='0;http://maple.example.edu:12430'>"));
        assert!(html.contains("<title>Redirecting</title>"));
    }

    #[test]
    fn test_search_results_escapes_term() {
        let names = vec!["cat.png".to_string()];
        let html = HtmlBuilder::search_results("<b>", "Pictures", &names).build();
        assert!(html.contains("<h1>Results for &lt;b&gt;</h1>"));
        assert!(html.contains("<img src=\"./Pictures/cat.png\" alt=\"cat.png\">"));
    }

    #[tokio::test]
    async fn test_find_images_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("BlackCat.png"), b"1").unwrap();
        fs::write(dir.path().join("cat_small.jpg"), b"2").unwrap();
        fs::write(dir.path().join("dog.gif"), b"3").unwrap();
        fs::create_dir(dir.path().join("cats")).unwrap();

        let names = find_images(dir.path(), "cat").await.unwrap();
        assert_eq!(names, vec!["BlackCat.png".to_string(), "cat_small.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_find_images_empty_term_matches_all_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"1").unwrap();
        fs::write(dir.path().join("b.png"), b"2").unwrap();

        assert_eq!(find_images(dir.path(), "").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_images_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let names = find_images(&dir.path().join("Pictures"), "cat").await.unwrap();
        assert!(names.is_empty());
    }
}
