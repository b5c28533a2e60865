// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

#[cfg(test)]
mod security_tests {
    //! # 安全回归测试
    //!
    //! - 路径遍历：两种解析模式下都不能读到文档根目录之外的文件
    //! - 畸形报文：超长请求行、空字节、非 UTF-8 请求行
    //! - 慢速连接：一个不发送数据的客户端不影响其他连接

    use memserve::{
        Acceptor, FileServer, MemoryStore, PathResolver, ReadThroughCache, ResolveMode,
        WorkerPool,
    };

    use proptest::prelude::*;
    use std::{
        fs,
        net::SocketAddr,
        path::{Component, Path, PathBuf},
        sync::Arc,
        time::Duration,
    };
    use tempfile::TempDir;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
        time::timeout,
    };

    const SECRET: &[u8] = b"root:x:0:0:secret";

    /// ```text
    /// <tmp>/passwd
    /// <tmp>/www/index.html
    /// <tmp>/www/sub/page.html
    /// ```
    fn fixture() -> (TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("passwd"), SECRET).unwrap();
        let root = tmp.path().join("www");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("index.html"), b"<h1>index</h1>").unwrap();
        fs::write(root.join("sub/page.html"), b"page").unwrap();
        (tmp, root)
    }

    async fn start(root: &Path, mode: ResolveMode) -> SocketAddr {
        let acceptor = Acceptor::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = acceptor.local_addr().unwrap();
        let handler = Arc::new(FileServer::new(
            PathResolver::new(root, mode),
            ReadThroughCache::new(Arc::new(MemoryStore::new(0)), 0),
            "Pictures",
        ));
        tokio::spawn(acceptor.run(handler, WorkerPool::new(8)));
        addr
    }

    async fn send_request(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        if stream.write_all(request).await.is_err() {
            return Vec::new();
        }
        let mut buffer = Vec::new();
        // 设置硬超时限制，防止测试用例因服务器挂起而永久阻塞
        let _ = timeout(Duration::from_secs(5), stream.read_to_end(&mut buffer))
            .await
            .expect("服务器在5秒内没有关闭连接");
        buffer
    }

    fn extract_status_code(response: &[u8]) -> u16 {
        String::from_utf8_lossy(response)
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0)
    }

    const TRAVERSALS: [&str; 8] = [
        "../passwd",
        "/../passwd",
        "/../../passwd",
        "/..//passwd",
        "/sub/../../passwd",
        "/....//passwd",
        "/%2e%2e/passwd",
        "/./../passwd",
    ];

    #[tokio::test]
    async fn test_path_traversal_over_socket() {
        let (_tmp, root) = fixture();
        for mode in [ResolveMode::Heuristic, ResolveMode::Strict] {
            let addr = start(&root, mode).await;
            for target in TRAVERSALS {
                let request = format!("GET {} HTTP/1.1\r\n\r\n", target);
                let response = send_request(addr, request.as_bytes()).await;
                assert_eq!(extract_status_code(&response), 404, "{:?} {}", mode, target);
                assert!(
                    !response.windows(SECRET.len()).any(|w| w == SECRET),
                    "{:?} {}",
                    mode,
                    target
                );
            }
        }
    }

    #[test]
    fn test_etc_passwd_not_found() {
        let (_tmp, root) = fixture();
        for mode in [ResolveMode::Heuristic, ResolveMode::Strict] {
            let resolver = PathResolver::new(&root, mode);
            assert_eq!(resolver.resolve("../../etc/passwd"), None);
            assert_eq!(resolver.resolve("/etc/passwd"), None);
        }
    }

    #[tokio::test]
    async fn test_oversized_request_line() {
        let (_tmp, root) = fixture();
        let addr = start(&root, ResolveMode::Heuristic).await;

        let request = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(20_000));
        let response = send_request(addr, request.as_bytes()).await;
        assert!(response.is_empty());

        // 服务器仍然可以处理后续请求
        let response = send_request(addr, b"GET / HTTP/1.1\r\n\r\n").await;
        assert_eq!(extract_status_code(&response), 200);
    }

    #[tokio::test]
    async fn test_null_byte_injection() {
        let (_tmp, root) = fixture();
        let addr = start(&root, ResolveMode::Heuristic).await;

        let response = send_request(addr, b"GET /index.html\x00.png HTTP/1.1\r\n\r\n").await;
        assert_eq!(extract_status_code(&response), 404);
    }

    #[tokio::test]
    async fn test_non_utf8_request_line() {
        let (_tmp, root) = fixture();
        let addr = start(&root, ResolveMode::Heuristic).await;

        let response = send_request(addr, b"GET /\xff\xfe HTTP/1.1\r\n\r\n").await;
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_slow_client_does_not_block_others() {
        let (_tmp, root) = fixture();
        let addr = start(&root, ResolveMode::Heuristic).await;

        let mut slow = TcpStream::connect(addr).await.unwrap();
        slow.write_all(b"GET / HT").await.unwrap();

        let response = send_request(addr, b"GET /sub/page.html HTTP/1.1\r\n\r\n").await;
        assert_eq!(extract_status_code(&response), 200);
        assert!(response.ends_with(b"page"));
    }

    fn stays_under(resolved: &Path, root: &Path) -> bool {
        resolved.starts_with(root) && !resolved.components().any(|c| c == Component::ParentDir)
    }

    proptest! {
        #[test]
        fn prop_heuristic_never_escapes(target in "[./a-z%]{0,24}") {
            let (tmp, root) = fixture();
            let resolver = PathResolver::new(&root, ResolveMode::Heuristic);
            if let Some(path) = resolver.resolve(&target) {
                prop_assert!(stays_under(&path, &root), "{} -> {}", target, path.display());
                prop_assert_ne!(path, tmp.path().join("passwd"));
            }
        }

        #[test]
        fn prop_strict_never_escapes(target in "[./a-z%?#]{0,24}") {
            let (_tmp, root) = fixture();
            let canonical = root.canonicalize().unwrap();
            let resolver = PathResolver::new(&root, ResolveMode::Strict);
            if let Some(path) = resolver.resolve(&target) {
                prop_assert!(stays_under(&path, &canonical), "{} -> {}", target, path.display());
            }
        }

        #[test]
        fn prop_traversal_prefixes(depth in 1usize..6, name in "(passwd|index\\.html)") {
            let (tmp, root) = fixture();
            let target = format!("/{}{}", "../".repeat(depth), name);
            for mode in [ResolveMode::Heuristic, ResolveMode::Strict] {
                let resolved = PathResolver::new(&root, mode).resolve(&target);
                if let Some(path) = resolved {
                    prop_assert!(path.starts_with(root.canonicalize().unwrap()) || path.starts_with(&root));
                    prop_assert_ne!(path, tmp.path().join("passwd"));
                }
            }
        }
    }
}
