// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接层
//!
//! - [`serve`]：主循环，接受 TCP 连接并为每个连接派生一个 tokio 任务。
//! - [`handle_connection`]：读取一份完整请求，交给 [`App`] 处理，写回响应后关闭连接。
//! - [`run_console`]：从标准输入读取运维指令（`stop` / `status` / `help`）。

use crate::{
    config::Config,
    exception::Exception,
    handlers::App,
    middleware,
    request::Request,
    response::Response,
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
    sync::Notify,
    time::{sleep, Duration},
};

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
    time::Instant,
};

/// 停机标志与活跃连接计数，由主循环、连接任务和控制台共享。
#[derive(Debug, Default)]
pub struct ServerState {
    shutdown: AtomicBool,
    active_connections: AtomicU32,
    wakeup: Notify,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wakeup.notify_one();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::SeqCst)
    }

    fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::SeqCst);
    }

    fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 持有期间计入一个活跃连接
struct ConnectionGuard {
    state: Arc<ServerState>,
}

impl ConnectionGuard {
    fn new(state: Arc<ServerState>) -> Self {
        state.connection_opened();
        Self { state }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.connection_closed();
    }
}

/// 按配置绑定监听地址：`local = true` 时只监听回环地址。
pub async fn bind(config: &Config) -> io::Result<TcpListener> {
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}:{}上监听Socket连接", address, config.port());
    TcpListener::bind(SocketAddrV4::new(address, config.port())).await
}

/// 主事件循环。收到停机指令后不再接受新连接，等待在途请求处理完毕再返回。
pub async fn serve(
    listener: TcpListener,
    app: Arc<App>,
    state: Arc<ServerState>,
    max_request_size: usize,
) {
    let mut id: u128 = 0;

    loop {
        if state.is_shutting_down() {
            break;
        }

        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = state.wakeup.notified() => continue,
        };
        let (mut stream, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                error!("接受TCP连接失败: {}", e);
                continue;
            }
        };
        debug!("[ID{}]TCP连接已建立：{}", id, addr);

        let app = Arc::clone(&app);
        let guard = ConnectionGuard::new(Arc::clone(&state));
        tokio::spawn(async move {
            // 任务结束或 panic 时计数都会归还
            let _guard = guard;
            handle_connection(&mut stream, addr, id, app, max_request_size).await;
            if let Err(e) = stream.shutdown().await {
                debug!("[ID{}]关闭连接时出错: {}", id, e);
            }
        });
        id += 1;
    }

    info!("主循环接收到停机指令，等待{}个活跃连接结束", state.active_connections());
    while state.active_connections() > 0 {
        sleep(Duration::from_millis(20)).await;
    }
    info!("服务器已停止");
}

/// 处理单个连接上的唯一一个请求。写回失败只记录日志，不重试。
pub async fn handle_connection<S>(
    stream: &mut S,
    addr: SocketAddr,
    id: u128,
    app: Arc<App>,
    max_request_size: usize,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let start_time = Instant::now();

    let response = match read_request(stream, addr, id, max_request_size).await {
        Ok(Some(request)) => {
            let response = dispatch(app, request.clone(), id).await;
            info!(
                "[ID{}] {}, {}, {}, {}, {}, {}ms",
                id,
                request.version(),
                request.uri(),
                request.method(),
                response.status_code(),
                response.information(),
                start_time.elapsed().as_millis()
            );
            response
        }
        Ok(None) => {
            debug!("[ID{}]客户端未发送任何数据即关闭连接", id);
            return;
        }
        Err(e) => {
            warn!("[ID{}]请求无法处理: {}，返回{}", id, e, e.status_code());
            let mut response = Response::from_status_code(e.status_code(), &[], id);
            middleware::common_headers(&mut response);
            response
        }
    };

    let bytes = response.as_bytes();
    debug!("[ID{}]发送响应，长度: {}", id, bytes.len());
    if let Err(e) = stream.write_all(&bytes).await {
        error!("[ID{}]写入响应失败: {}", id, e);
        return;
    }
    if let Err(e) = stream.flush().await {
        error!("[ID{}]刷新响应失败: {}", id, e);
    }
}

async fn read_request<S>(
    stream: &mut S,
    addr: SocketAddr,
    id: u128,
    max_request_size: usize,
) -> Result<Option<Request>, Exception>
where
    S: AsyncRead + Unpin,
{
    let buffer = Request::read_from(stream, max_request_size, id).await?;
    if buffer.is_empty() {
        return Ok(None);
    }
    let request = Request::try_from(&buffer, id)?.with_remote_addr(&addr.to_string());
    Ok(Some(request))
}

/// 处理器是同步的（SQLite 调用会阻塞），放到阻塞线程池中执行。
async fn dispatch(app: Arc<App>, request: Request, id: u128) -> Response {
    let accept_encoding = request.accept_encoding().to_vec();
    match tokio::task::spawn_blocking(move || middleware::serve_request(&app, &request, id)).await
    {
        Ok(response) => response,
        Err(e) => {
            error!("[ID{}]处理任务异常终止: {}", id, e);
            let mut response = Response::from_status_code(500, &accept_encoding, id);
            middleware::common_headers(&mut response);
            response
        }
    }
}

/// 运维控制台。输入流结束或收到 `stop` 后返回。
pub async fn run_console<R>(reader: R, state: Arc<ServerState>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("读取控制台输入失败: {}", e);
                break;
            }
        };
        match line.trim() {
            "stop" => {
                state.request_shutdown();
                println!("停机指令已激活，服务器将在处理完在途请求后关闭...");
                break;
            }
            "help" => {
                println!("== Snippetbox Help ==");
                println!("stop   - 发出停机信号");
                println!("status - 查看当前服务器运行状态");
                println!("help   - 显示此帮助信息");
                println!("=====================");
            }
            "status" => {
                println!("== Snippetbox 状态 ==");
                println!("当前活跃连接数: {}", state.active_connections());
                println!("=====================");
            }
            "" => {}
            cmd => println!("无效的命令：{}", cmd),
        }
    }
}
