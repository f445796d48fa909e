// src/services/depotage_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        context::{ActionStation, OperationContext},
        error::AppError,
    },
    db::{CuveRepository, DepotageRepository, FinanceRepository},
    models::{
        depotage::{Depotage, DepotageStatut, NouveauDepotage},
        finance::TypeTransaction,
        stock::TypeMouvement,
    },
    services::stock_service::StockService,
};

/// Type de source d'un dépotage, identique sur le mouvement de stock et
/// l'écriture comptable.
pub const SOURCE_DEPOTAGE: &str = "DEPOTAGE";

#[derive(Clone)]
pub struct DepotageService {
    depotage_repo: DepotageRepository,
    cuve_repo: CuveRepository,
    finance_repo: FinanceRepository,
    stock_service: StockService,
}

impl DepotageService {
    pub fn new(
        depotage_repo: DepotageRepository,
        cuve_repo: CuveRepository,
        finance_repo: FinanceRepository,
        stock_service: StockService,
    ) -> Self {
        Self {
            depotage_repo,
            cuve_repo,
            finance_repo,
            stock_service,
        }
    }

    // --- Brouillon ---

    pub async fn creer<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        payload: &NouveauDepotage,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::CreerDepotage)?;
        payload.valider()?;

        let mut tx = executor.begin().await?;

        self.verifier_cuve_station(&mut tx, ctx, payload.cuve_id).await?;

        let depotage = self
            .depotage_repo
            .creer_depotage(&mut *tx, ctx.tenant_id, ctx.station_id, payload, ctx.actor_id)
            .await?;

        tx.commit().await?;

        tracing::info!(depotage_id = %depotage.id, "dépotage créé en brouillon");
        Ok(depotage)
    }

    pub async fn modifier<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        depotage_id: Uuid,
        payload: &NouveauDepotage,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::ModifierDepotage)?;
        payload.valider()?;

        let mut tx = executor.begin().await?;

        let depotage = self.depotage_verrouille(&mut tx, ctx, depotage_id).await?;
        depotage.verifier_mutable()?;

        self.verifier_cuve_station(&mut tx, ctx, payload.cuve_id).await?;

        let depotage = self
            .depotage_repo
            .modifier_depotage(&mut *tx, ctx.tenant_id, depotage_id, payload)
            .await?;

        tx.commit().await?;
        Ok(depotage)
    }

    // --- Workflow ---

    pub async fn soumettre<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        depotage_id: Uuid,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::SoumettreDepotage)?;

        let mut tx = executor.begin().await?;

        let depotage = self.depotage_verrouille(&mut tx, ctx, depotage_id).await?;
        depotage.statut.exiger_transition(DepotageStatut::Soumis)?;

        let depotage = self
            .depotage_repo
            .marquer_soumis(&mut *tx, ctx.tenant_id, depotage_id)
            .await?;

        tx.commit().await?;
        Ok(depotage)
    }

    /// SOUMIS → CONFIRME : contrôle physique. La cuve cible doit être
    /// utilisable (ACTIVE ou STANDBY) au moment de la confirmation.
    pub async fn confirmer<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        depotage_id: Uuid,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::ConfirmerDepotage)?;

        let mut tx = executor.begin().await?;

        let depotage = self.depotage_verrouille(&mut tx, ctx, depotage_id).await?;
        depotage.statut.exiger_transition(DepotageStatut::Confirme)?;

        let cuve = self
            .cuve_repo
            .get_cuve_for_update(&mut *tx, ctx.tenant_id, depotage.cuve_id)
            .await?;
        if !cuve.utilisable_pour_depotage() {
            return Err(AppError::MissingTank);
        }

        let depotage = self
            .depotage_repo
            .marquer_confirme(&mut *tx, ctx.tenant_id, depotage_id, ctx.actor_id)
            .await?;

        tx.commit().await?;

        tracing::info!(depotage_id = %depotage.id, "dépotage confirmé");
        Ok(depotage)
    }

    /// CONFIRME → TRANSFERE : entrée de stock de la quantité acceptée et
    /// écriture d'une DEPENSE du montant total, atomiques et idempotents.
    /// La capacité de la cuve n'est pas un plafond bloquant : le jaugeage
    /// physique fait foi, un dépassement se lit dans l'historique.
    pub async fn transferer<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        depotage_id: Uuid,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::TransfererDepotage)?;

        let mut tx = executor.begin().await?;

        // 1. Verrou + garde d'idempotence avant tout effet
        let depotage = self.depotage_verrouille(&mut tx, ctx, depotage_id).await?;
        depotage.verifier_transferable()?;

        // 2. La cuve est re-contrôlée sous verrou : son statut a pu
        // changer entre la confirmation et le transfert.
        let cuve = self
            .cuve_repo
            .get_cuve_for_update(&mut *tx, ctx.tenant_id, depotage.cuve_id)
            .await?;
        if !cuve.utilisable_pour_depotage() {
            return Err(AppError::MissingTank);
        }

        // 3. Entrée de stock de la quantité acceptée
        self.stock_service
            .enregistrer_mouvement(
                &mut *tx,
                ctx,
                cuve.id,
                TypeMouvement::Entree,
                depotage.quantite_acceptee,
                SOURCE_DEPOTAGE,
                depotage.id,
                depotage.date_depotage,
            )
            .await?;

        // 4. Écriture financière idempotente (coût d'achat)
        self.finance_repo
            .get_or_create_transaction(
                &mut *tx,
                ctx.tenant_id,
                ctx.station_id,
                TypeTransaction::Depense,
                depotage.montant_total,
                depotage.date_depotage,
                SOURCE_DEPOTAGE,
                depotage.id,
            )
            .await?;

        // 5. Bascule terminale
        let depotage = self
            .depotage_repo
            .marquer_transfere(&mut *tx, ctx.tenant_id, depotage_id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            depotage_id = %depotage.id,
            quantite = %depotage.quantite_acceptee,
            montant = %depotage.montant_total,
            "dépotage transféré : stock appliqué et dépense enregistrée"
        );
        Ok(depotage)
    }

    // --- Lectures ---

    pub async fn lister(&self, ctx: &OperationContext) -> Result<Vec<Depotage>, AppError> {
        self.depotage_repo
            .lister_par_station(ctx.tenant_id, ctx.station_id)
            .await
    }

    // --- Internes ---

    async fn depotage_verrouille(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        ctx: &OperationContext,
        depotage_id: Uuid,
    ) -> Result<Depotage, AppError> {
        let depotage = self
            .depotage_repo
            .get_depotage_for_update(&mut **tx, ctx.tenant_id, depotage_id)
            .await?;
        if depotage.station_id != ctx.station_id {
            return Err(AppError::NotFound("Dépotage"));
        }
        Ok(depotage)
    }

    /// La cuve visée doit exister et appartenir à la station du contexte.
    async fn verifier_cuve_station(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        ctx: &OperationContext,
        cuve_id: Uuid,
    ) -> Result<(), AppError> {
        let cuve = self
            .cuve_repo
            .get_cuve(&mut **tx, ctx.tenant_id, cuve_id)
            .await?;
        if cuve.station_id != ctx.station_id {
            return Err(AppError::NotFound("Cuve"));
        }
        Ok(())
    }
}
