use chrono::Utc;
use mongodb::{
    bson::{doc, to_bson, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            pagination::Pagination,
            petition::{
                non_blank, PetitionList, PetitionSpec, PetitionSummary, PetitionView,
                RespondRequest, SignResponse, StatusUpdate,
            },
        },
        common::{location_matches, location_regex, Category, PetitionStatus, Role},
        db::{
            AdminLogCore, NewAdminLog, NewPetition, NewSignature, OfficialResponse, Petition,
            PetitionCore, Signature, SignatureCore, User,
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

use super::common::{audit, petition_by_id, user_by_token};

pub fn routes() -> Vec<Route> {
    routes![
        create_petition,
        get_petitions,
        get_petition,
        sign_petition,
        update_status,
        update_status_patch,
        respond,
    ]
}

#[post("/petitions", data = "<spec>", format = "json")]
pub async fn create_petition(
    token: AuthToken,
    spec: Json<PetitionSpec>,
    petitions: Coll<NewPetition>,
) -> Result<(Status, Json<PetitionSummary>)> {
    let category = spec.validate()?;

    let petition = PetitionCore::new(
        spec.title.trim().to_string(),
        spec.description.trim().to_string(),
        category,
        spec.location.trim().to_string(),
        token.id(),
    );
    let new_id: Id = petitions
        .insert_one(&petition, None)
        .await?
        .inserted_id
        .as_object_id()
        .unwrap() // Valid because the ID comes directly from the DB
        .into();

    let petition = Petition {
        id: new_id,
        petition,
    };
    Ok((Status::Created, Json(PetitionSummary::from(&petition))))
}

#[get("/petitions?<category>&<status>&<location>")]
pub async fn get_petitions(
    token: Option<AuthToken>,
    category: Option<&str>,
    status: Option<&str>,
    location: Option<&str>,
    pagination: Pagination,
    petitions: Coll<Petition>,
    users: Coll<User>,
) -> Result<Json<PetitionList>> {
    let mut filter = Document::new();
    if let Some(category) = category {
        filter.insert(
            "category",
            category.parse::<Category>().map_err(Error::BadRequest)?,
        );
    }
    if let Some(status) = status {
        filter.insert(
            "status",
            status.parse::<PetitionStatus>().map_err(Error::BadRequest)?,
        );
    }
    if let Some(location) = location {
        filter.insert("location", location_regex(location));
    }

    // Officials only see petitions within their own jurisdiction,
    // regardless of any requested location filter.
    if let Some(token) = token {
        if token.role() == Role::Official {
            let official = user_by_token(&token, &users).await?;
            filter.insert("location", location_regex(&official.location));
        }
    }

    let options = FindOptions::builder()
        .sort(doc! {"created_at": -1})
        .skip(pagination.skip())
        .limit(pagination.page_size() as i64)
        .build();
    let page: Vec<Petition> = petitions
        .find(filter.clone(), options)
        .await?
        .try_collect()
        .await?;
    let total = petitions.count_documents(filter, None).await?;

    Ok(Json(PetitionList {
        pagination: pagination.result(total),
        petitions: page.iter().map(PetitionSummary::from).collect(),
    }))
}

#[get("/petitions/<id>")]
pub async fn get_petition(
    id: &str,
    petitions: Coll<Petition>,
    users: Coll<User>,
    signatures: Coll<Signature>,
) -> Result<Json<PetitionView>> {
    let petition = petition_by_id(id, &petitions).await?;
    Ok(Json(resolved_view(&petition, &users, &signatures).await?))
}

#[post("/petitions/<id>/sign")]
pub async fn sign_petition(
    token: AuthToken,
    id: &str,
    petitions: Coll<Petition>,
    signatures: Coll<Signature>,
    new_signatures: Coll<NewSignature>,
) -> Result<(Status, Json<SignResponse>)> {
    let petition = petition_by_id(id, &petitions).await?;

    if petition.status != PetitionStatus::Active {
        return Err(Error::bad_request("Cannot sign. Petition is not active."));
    }

    // The unique (petition, user) index turns a concurrent double-sign
    // into a duplicate key error rather than a second signature.
    let signature = SignatureCore::new(petition.id, token.id());
    match new_signatures.insert_one(&signature, None).await {
        Ok(_) => {}
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(Error::bad_request("You have already signed this petition."));
        }
        Err(err) => return Err(err.into()),
    }

    let signature_count = signatures
        .count_documents(doc! {"petition": petition.id}, None)
        .await?;

    Ok((
        Status::Created,
        Json(SignResponse {
            message: "Petition signed successfully".to_string(),
            signature_count,
        }),
    ))
}

#[put("/petitions/<id>", data = "<update>", format = "json")]
pub async fn update_status(
    token: AuthToken,
    id: &str,
    update: Json<StatusUpdate>,
    petitions: Coll<Petition>,
    users: Coll<User>,
    signatures: Coll<Signature>,
    logs: Coll<NewAdminLog>,
) -> Result<Json<PetitionView>> {
    update_petition_status(token, id, update, petitions, users, signatures, logs).await
}

#[patch("/petitions/<id>", data = "<update>", format = "json")]
pub async fn update_status_patch(
    token: AuthToken,
    id: &str,
    update: Json<StatusUpdate>,
    petitions: Coll<Petition>,
    users: Coll<User>,
    signatures: Coll<Signature>,
    logs: Coll<NewAdminLog>,
) -> Result<Json<PetitionView>> {
    update_petition_status(token, id, update, petitions, users, signatures, logs).await
}

async fn update_petition_status(
    token: AuthToken,
    id: &str,
    update: Json<StatusUpdate>,
    petitions: Coll<Petition>,
    users: Coll<User>,
    signatures: Coll<Signature>,
    logs: Coll<NewAdminLog>,
) -> Result<Json<PetitionView>> {
    token.require(Role::Official)?;
    let status: PetitionStatus = update.status.parse().map_err(Error::BadRequest)?;
    let id: Id = id.parse()?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let petition = petitions
        .find_one_and_update(id.as_doc(), doc! {"$set": {"status": status}}, options)
        .await?
        .ok_or_else(|| Error::not_found(format!("Petition with ID '{}'", id)))?;

    audit(&logs, AdminLogCore::status_update(token.id(), id, status)).await;

    Ok(Json(resolved_view(&petition, &users, &signatures).await?))
}

#[post("/petitions/<id>/response", data = "<request>", format = "json")]
pub async fn respond(
    token: AuthToken,
    id: &str,
    request: Json<RespondRequest>,
    petitions: Coll<Petition>,
    users: Coll<User>,
    signatures: Coll<Signature>,
    logs: Coll<NewAdminLog>,
) -> Result<Json<PetitionView>> {
    token.require(Role::Official)?;
    non_blank(&request.response, "response")?;
    let status = match &request.status {
        Some(status) => status.parse().map_err(Error::BadRequest)?,
        None => PetitionStatus::Closed,
    };

    let official = user_by_token(&token, &users).await?;
    let petition = petition_by_id(id, &petitions).await?;

    if !location_matches(&petition.location, &official.location) {
        return Err(Error::forbidden(
            "You are not allowed to respond to this petition",
        ));
    }

    let response = OfficialResponse {
        text: request.response.trim().to_string(),
        official: official.id,
        responded_at: Utc::now(),
    };
    let update = doc! {
        "$set": {
            "status": status,
            "official_response": to_bson(&response)
                .unwrap(), // Valid because `OfficialResponse` serialization doesn't fail
        }
    };
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let petition = petitions
        .find_one_and_update(petition.id.as_doc(), update, options)
        .await?
        .ok_or_else(|| Error::not_found(format!("Petition with ID '{}'", petition.id)))?;

    audit(
        &logs,
        AdminLogCore::response_submitted(token.id(), petition.id, status),
    )
    .await;

    Ok(Json(resolved_view(&petition, &users, &signatures).await?))
}

/// Resolve the creator and responder identities and the signature count.
async fn resolved_view(
    petition: &Petition,
    users: &Coll<User>,
    signatures: &Coll<Signature>,
) -> Result<PetitionView> {
    let creator = users.find_one(petition.creator.as_doc(), None).await?;
    let responder = match &petition.official_response {
        Some(response) => users.find_one(response.official.as_doc(), None).await?,
        None => None,
    };
    let signature_count = signatures
        .count_documents(doc! {"petition": petition.id}, None)
        .await?;
    Ok(PetitionView::new(
        petition,
        creator.as_ref(),
        responder.as_ref(),
        signature_count,
    ))
}
