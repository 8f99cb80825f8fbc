use std::{future::Future, sync::Arc};

use anyhow::{Error, Result};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{
    broker::Gateway,
    collector::{kline, order},
    config::{self, Schedule},
    logging, prompt,
};

/// 啟動排程，設定檔中空白的表達式不會建立工作
pub async fn start(sched: &JobScheduler, gateway: Arc<dyn Gateway>) -> Result<()> {
    let jobs = build_jobs(&config::SETTINGS.schedule, gateway);
    let count = jobs.len();

    for job in jobs {
        sched.add(job).await?;
    }

    sched.start().await?;

    logging::info_file_async(format!("排程已啟動，共 {} 個工作", count));

    Ok(())
}

fn build_jobs(schedule: &Schedule, gateway: Arc<dyn Gateway>) -> Vec<Job> {
    //                 sec  min   hour   day of month   month   day of week
    //let expression = "0   30   9,12,15     1,15       May-Aug  Mon,Wed,Fri";
    let kline_gw = gateway.clone();
    let order_gw = gateway;

    let jobs = vec![
        // 收盤後取得 K 線
        create_job(&schedule.kline, move || {
            let gw = kline_gw.clone();
            async move { kline::execute(gw.as_ref(), None).await }
        }),
        // 取得歷史訂單
        create_job(&schedule.order, move || {
            let gw = order_gw.clone();
            async move { order::execute(gw.as_ref(), None).await }
        }),
        // 產生提示語
        create_job(&schedule.prompt, || async { prompt::execute(None) }),
    ];

    jobs.into_iter().flatten().collect()
}

/// 表達式為空時回傳 None，表達式有誤時記錄後略過
fn create_job<F, Fut>(cron_expr: &str, task: F) -> Option<Job>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send,
{
    let cron_expr = cron_expr.trim();
    if cron_expr.is_empty() {
        return None;
    }

    let expr = cron_expr.to_string();
    let job = Job::new_async(cron_expr, move |_uuid, _l| {
        let task = task.clone();
        let expr = expr.clone();
        Box::pin(async move {
            if let Err(why) = task().await {
                logging::error_file_async(format!(
                    "Failed to execute task({}) because {:?}",
                    expr, why
                ));
            }
        })
    });

    match job {
        Ok(job) => Some(job),
        Err(why) => {
            logging::error_file_async(format!(
                "Failed to create job({}) because {:?}",
                cron_expr, why
            ));
            None
        }
    }
}
