use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::{ApiClient, MessageResponse};
use crate::errors::AppResult;
use crate::models::machine::{Machine, MachineCreateRequest, MachineUpdateRequest};

/// Query filters passed through verbatim, e.g. `[("machine_id", "3")]`.
pub type Filters = Vec<(&'static str, String)>;

impl ApiClient {
    // =========================================================================
    // MACHINES
    // =========================================================================

    pub async fn list_machines(&self) -> AppResult<Vec<Machine>> {
        self.get_data("/machines").await
    }

    pub async fn get_machine(&self, id: i64) -> AppResult<Machine> {
        self.get_data(&format!("/machines/{}", id)).await
    }

    pub async fn create_machine(&self, payload: &MachineCreateRequest) -> AppResult<Machine> {
        self.send_data(Method::POST, "/admin/machines", payload).await
    }

    pub async fn update_machine(
        &self,
        id: i64,
        payload: &MachineUpdateRequest,
    ) -> AppResult<MessageResponse> {
        self.send_ack(Method::PUT, &format!("/admin/machines/{}", id), Some(payload))
            .await
    }

    pub async fn delete_machine(&self, id: i64) -> AppResult<MessageResponse> {
        self.delete(&format!("/admin/machines/{}", id)).await
    }

    // =========================================================================
    // JOB ORDERS
    // =========================================================================

    pub async fn list_job_orders(&self) -> AppResult<Value> {
        self.get_data("/job-orders").await
    }

    pub async fn get_job_order(&self, id: i64) -> AppResult<Value> {
        self.get_data(&format!("/job-orders/{}", id)).await
    }

    pub async fn job_orders_by_machine(&self, machine_id: i64) -> AppResult<Value> {
        self.get_data(&format!("/job-orders/machine/{}", machine_id))
            .await
    }

    pub async fn create_job_order<B: Serialize + ?Sized>(&self, payload: &B) -> AppResult<Value> {
        self.send_data(Method::POST, "/job-orders", payload).await
    }

    pub async fn update_job_order<B: Serialize + ?Sized>(
        &self,
        id: i64,
        payload: &B,
    ) -> AppResult<MessageResponse> {
        self.send_ack(Method::PUT, &format!("/job-orders/{}", id), Some(payload))
            .await
    }

    pub async fn delete_job_order(&self, id: i64) -> AppResult<MessageResponse> {
        self.delete(&format!("/job-orders/{}", id)).await
    }

    pub async fn update_process_stage<B: Serialize + ?Sized>(
        &self,
        stage_id: i64,
        payload: &B,
    ) -> AppResult<MessageResponse> {
        self.send_ack(
            Method::PUT,
            &format!("/process-stages/{}", stage_id),
            Some(payload),
        )
        .await
    }

    // =========================================================================
    // PPIC SCHEDULES, LINKS, GANTT
    // =========================================================================

    pub async fn list_ppic_schedules(&self) -> AppResult<Value> {
        self.get_data("/ppic-schedules").await
    }

    pub async fn get_ppic_schedule(&self, id: i64) -> AppResult<Value> {
        self.get_data(&format!("/ppic-schedules/{}", id)).await
    }

    pub async fn create_ppic_schedule<B: Serialize + ?Sized>(&self, payload: &B) -> AppResult<Value> {
        self.send_data(Method::POST, "/ppic-schedules", payload).await
    }

    pub async fn update_ppic_schedule<B: Serialize + ?Sized>(
        &self,
        id: i64,
        payload: &B,
    ) -> AppResult<Value> {
        self.send_data(Method::PUT, &format!("/ppic-schedules/{}", id), payload)
            .await
    }

    pub async fn delete_ppic_schedule(&self, id: i64) -> AppResult<MessageResponse> {
        self.delete(&format!("/ppic-schedules/{}", id)).await
    }

    pub async fn ppic_schedules_by_machine(&self, machine_id: i64) -> AppResult<Value> {
        self.get_data(&format!("/ppic-schedules/machine/{}", machine_id))
            .await
    }

    pub async fn gantt_chart(&self, filters: &Filters) -> AppResult<Value> {
        self.get_data_with_query("/gantt-chart", filters).await
    }

    pub async fn list_ppic_links(&self) -> AppResult<Value> {
        self.get_data("/ppic-links").await
    }

    pub async fn create_ppic_link<B: Serialize + ?Sized>(&self, payload: &B) -> AppResult<Value> {
        self.send_data(Method::POST, "/ppic-links", payload).await
    }

    pub async fn delete_ppic_link(&self, id: i64) -> AppResult<MessageResponse> {
        self.delete(&format!("/ppic-links/{}", id)).await
    }

    // =========================================================================
    // GOOGLE SHEETS
    // =========================================================================

    pub async fn part_name_by_order_number(&self, order_number: &str) -> AppResult<Value> {
        let url = self.segment_url("/google-sheets/part-name", order_number)?;
        self.get_data_at(url).await
    }

    pub async fn google_sheets_data(&self) -> AppResult<Value> {
        self.get_data("/google-sheets/all-data").await
    }

    // =========================================================================
    // TOOLPATHER FILES (metadata only; uploads go through the browser)
    // =========================================================================

    pub async fn list_toolpather_files(&self, filters: &Filters) -> AppResult<Value> {
        self.get_data_with_query("/toolpather-files", filters).await
    }

    pub async fn my_toolpather_files(&self) -> AppResult<Value> {
        self.get_data("/toolpather-files/my-files").await
    }

    pub async fn get_toolpather_file(&self, id: i64) -> AppResult<Value> {
        self.get_data(&format!("/toolpather-files/{}", id)).await
    }

    pub async fn toolpather_files_by_order(&self, order_number: &str) -> AppResult<Value> {
        let url = self.segment_url("/toolpather-files/order", order_number)?;
        self.get_data_at(url).await
    }

    pub fn toolpather_file_download_url(&self, id: i64) -> String {
        self.url(&format!("/toolpather-files/{}/download", id))
    }

    pub async fn delete_toolpather_file(&self, id: i64) -> AppResult<MessageResponse> {
        self.delete(&format!("/toolpather-files/{}", id)).await
    }
}
