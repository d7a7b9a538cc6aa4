use tracing::warn;

use crate::storage::{ClickEvent, LinkStatus, ShortLink, UserId};
use migration::entities::{shortlink, shortlink_click};

/// 将 Sea-ORM Model 转换为 ShortLink
pub fn model_to_shortlink(model: shortlink::Model) -> ShortLink {
    let status = model.status.parse::<LinkStatus>().unwrap_or_else(|e| {
        // 未知状态按停用处理，不放行跳转
        warn!("{} (link id {}), treating as inactive", e, model.id);
        LinkStatus::Inactive
    });

    ShortLink {
        id: model.id,
        owner: model.user_id.map(UserId),
        original_url: model.original_url,
        short_code: model.short_code,
        status,
        redirect_count: model.redirect_count.max(0),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn model_to_click(model: shortlink_click::Model) -> ClickEvent {
    ClickEvent {
        id: model.id,
        shortlink_id: model.shortlink_id,
        ip: model.ip_address,
        user_agent: model.user_agent,
        clicked_at: model.clicked_at,
    }
}
