use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::Message;
use tokio::sync::mpsc;

use crate::auth::session::get_user_id;
use crate::notify::{self, ConnectionMap};

/// GET /api/v1/ws - WebSocket upgrade for live notifications.
pub async fn ws_connect(
    req: HttpRequest,
    body: web::Payload,
    session: Session,
    conn_map: web::Data<ConnectionMap>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = match get_user_id(&session) {
        Some(id) => id,
        None => return Ok(HttpResponse::Unauthorized().finish()),
    };

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, body)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    notify::register(&conn_map, user_id, tx);
    log::debug!("Websocket opened for user {user_id}");

    let conn_map = conn_map.into_inner();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    if ws_session.text(msg).await.is_err() {
                        break;
                    }
                }
                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if ws_session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        // Client actions go through the REST API.
                        _ => {}
                    }
                }
                else => break,
            }
        }

        drop(rx);
        notify::prune_closed(&conn_map, user_id);
        let _ = ws_session.close(None).await;
        log::debug!("Websocket closed for user {user_id}");
    });

    Ok(response)
}
